//! Reducer composition utilities
//!
//! A storefront feature is usually several small reducers over one action type,
//! each owning a slice of the feature state:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a reducer on a subset of state
//!
//! # Examples
//!
//! ```
//! use storefront_core::{smallvec, Effect, Reducer, SmallVec};
//! use storefront_core::composition::{combine_reducers, scope_reducer};
//!
//! #[derive(Clone, Default)]
//! struct AccountState {
//!     reset_requested: bool,
//!     messages: Vec<String>,
//! }
//!
//! #[derive(Clone)]
//! enum AccountAction {
//!     ResetEmailSent,
//! }
//!
//! struct ResetReducer;
//! struct MessageReducer;
//!
//! impl Reducer for ResetReducer {
//!     type State = bool;
//!     type Action = AccountAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut bool, _action: AccountAction, _env: &()) -> SmallVec<[Effect<AccountAction>; 4]> {
//!         *state = true;
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! impl Reducer for MessageReducer {
//!     type State = Vec<String>;
//!     type Action = AccountAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Vec<String>, _action: AccountAction, _env: &()) -> SmallVec<[Effect<AccountAction>; 4]> {
//!         state.push("passwordResetEmailSent".to_string());
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let account = combine_reducers(vec![
//!     Box::new(scope_reducer(
//!         ResetReducer,
//!         |s: &AccountState| &s.reset_requested,
//!         |s: &mut AccountState, v: bool| s.reset_requested = v,
//!     )),
//!     Box::new(scope_reducer(
//!         MessageReducer,
//!         |s: &AccountState| &s.messages,
//!         |s: &mut AccountState, v: Vec<String>| s.messages = v,
//!     )),
//! ]);
//!
//! let mut state = AccountState::default();
//! let _ = account.reduce(&mut state, AccountAction::ResetEmailSent, &());
//! assert!(state.reset_requested);
//! assert_eq!(state.messages.len(), 1);
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated
/// in the order the reducers were given.
#[must_use]
pub fn combine_reducers<S, A, E>(
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
) -> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects.into_iter().filter(|effect| !effect.is_none()));
        }

        if all_effects.is_empty() {
            all_effects.push(Effect::None);
        }

        all_effects
    }
}

/// Scopes a reducer to operate on a subset of a larger state.
///
/// The sub-state is cloned out, reduced, and written back, so the child reducer
/// never sees the rest of the parent state.
pub fn scope_reducer<S, SubS, A, E, R>(
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&mut S, SubS),
) -> ScopedReducer<S, SubS, A, E, R>
where
    S: 'static,
    SubS: Clone + 'static,
    A: 'static,
    E: 'static,
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
        _phantom: std::marker::PhantomData,
    }
}

/// A scoped reducer that operates on a subset of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, E, R>
where
    S: 'static,
    SubS: Clone + 'static,
    A: 'static,
    E: 'static,
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&mut S, SubS),
    _phantom: std::marker::PhantomData<fn() -> (A, E)>,
}

impl<S, SubS, A, E, R> Reducer for ScopedReducer<S, SubS, A, E, R>
where
    S: 'static,
    SubS: Clone + 'static,
    A: 'static,
    E: 'static,
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut sub_state = (self.get_state)(state).clone();

        let effects = self.reducer.reduce(&mut sub_state, action, env);

        (self.set_state)(state, sub_state);

        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;

    #[derive(Clone, Default)]
    struct CouponPageState {
        loaded: u32,
        sort: String,
    }

    #[derive(Clone)]
    enum CouponAction {
        Loaded,
        Unloaded,
        SortChanged(String),
    }

    struct LoadReducer;

    impl Reducer for LoadReducer {
        type State = CouponPageState;
        type Action = CouponAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                CouponAction::Loaded => state.loaded += 1,
                CouponAction::Unloaded => state.loaded -= 1,
                CouponAction::SortChanged(_) => {},
            }
            smallvec![Effect::None]
        }
    }

    struct SortReducer;

    impl Reducer for SortReducer {
        type State = CouponPageState;
        type Action = CouponAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            if let CouponAction::SortChanged(sort) = action {
                state.sort = sort;
            }
            smallvec![Effect::None]
        }
    }

    #[test]
    fn test_combine_reducers() {
        let combined = combine_reducers(vec![Box::new(LoadReducer), Box::new(SortReducer)]);

        let mut state = CouponPageState::default();

        let _ = combined.reduce(&mut state, CouponAction::Loaded, &());
        assert_eq!(state.loaded, 1);

        let _ = combined.reduce(
            &mut state,
            CouponAction::SortChanged("byEndDateAsc".to_string()),
            &(),
        );
        assert_eq!(state.sort, "byEndDateAsc");

        let _ = combined.reduce(&mut state, CouponAction::Unloaded, &());
        assert_eq!(state.loaded, 0);
        assert_eq!(state.sort, "byEndDateAsc");
    }

    #[test]
    fn combined_none_effects_collapse_to_one() {
        let combined = combine_reducers(vec![Box::new(LoadReducer), Box::new(SortReducer)]);
        let mut state = CouponPageState::default();

        let effects = combined.reduce(&mut state, CouponAction::Loaded, &());
        assert_eq!(effects.len(), 1);
        assert!(effects[0].is_none());
    }

    #[derive(Clone, Default)]
    struct PageState {
        coupons: CouponPageState,
        title: String,
    }

    #[test]
    fn test_scope_reducer() {
        let scoped = scope_reducer(
            LoadReducer,
            |parent: &PageState| &parent.coupons,
            |parent: &mut PageState, coupons: CouponPageState| {
                parent.coupons = coupons;
            },
        );

        let mut state = PageState {
            coupons: CouponPageState::default(),
            title: "My coupons".to_string(),
        };

        let _ = scoped.reduce(&mut state, CouponAction::Loaded, &());
        let _ = scoped.reduce(&mut state, CouponAction::Loaded, &());
        assert_eq!(state.coupons.loaded, 2);
        assert_eq!(state.title, "My coupons");
    }
}
