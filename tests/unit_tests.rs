//! Unit tests for mergeq modules

mod common;

mod ordering_test {
    use crate::common::make_state;
    use mergeq::queue::{BuildStatus, PullRequestState, RepoQueue, order_queue};

    fn numbers(states: &[PullRequestState]) -> Vec<u64> {
        order_queue(states).into_iter().map(|s| s.number).collect()
    }

    #[test]
    fn test_approved_before_unapproved_regardless_of_priority() {
        let states = vec![make_state(1, "", 100), make_state(2, "alice", 0)];
        assert_eq!(numbers(&states), vec![2, 1]);
    }

    #[test]
    fn test_higher_priority_first_within_bucket() {
        let states = vec![
            make_state(1, "alice", 0),
            make_state(2, "alice", 5),
            make_state(3, "alice", -1),
        ];
        assert_eq!(numbers(&states), vec![2, 1, 3]);
    }

    #[test]
    fn test_ties_break_by_number() {
        let states = vec![
            make_state(9, "alice", 1),
            make_state(4, "bob", 1),
            make_state(6, "", 0),
            make_state(5, "", 0),
        ];
        assert_eq!(numbers(&states), vec![4, 9, 5, 6]);
    }

    #[test]
    fn test_status_does_not_affect_order() {
        let mut testing = make_state(3, "alice", 0);
        testing.status = BuildStatus::Testing;
        let states = vec![testing, make_state(1, "alice", 0)];
        assert_eq!(numbers(&states), vec![1, 3]);
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let states = vec![
            make_state(7, "", 3),
            make_state(2, "alice", 1),
            make_state(5, "bob", 1),
            make_state(1, "", 3),
            make_state(3, "alice", 9),
        ];
        let first = numbers(&states);
        let mut reversed = states.clone();
        reversed.reverse();

        assert_eq!(first, vec![3, 2, 5, 1, 7]);
        assert_eq!(numbers(&states), first);
        assert_eq!(numbers(&reversed), first);
    }

    #[test]
    fn test_repo_queue_ordered_numbers() {
        let mut queue = RepoQueue::new();
        queue.insert(make_state(10, "", 0));
        queue.insert(make_state(11, "alice", 0));
        assert_eq!(queue.ordered_numbers(), vec![11, 10]);
    }

    #[test]
    fn test_repo_queue_rejects_duplicate_number() {
        let mut queue = RepoQueue::new();
        assert!(queue.insert(make_state(1, "", 0)));
        assert!(!queue.insert(make_state(1, "alice", 9)));
        assert_eq!(queue.len(), 1);
        assert!(!queue.get(1).unwrap().is_approved());
    }
}

mod command_test {
    use crate::common::make_state;
    use mergeq::queue::{BuildStatus, CommandContext, parse_commands};

    #[test]
    fn test_r_plus_approves_as_commenter() {
        let mut state = make_state(1, "", 0);
        assert!(parse_commands("r+", "alice", &mut state, CommandContext::Live));
        assert_eq!(state.approved_by, "alice");
    }

    #[test]
    fn test_r_equals_me_approves_as_commenter() {
        let mut state = make_state(1, "", 0);
        assert!(parse_commands("r=me", "alice", &mut state, CommandContext::Live));
        assert_eq!(state.approved_by, "alice");
    }

    #[test]
    fn test_r_equals_name_delegates() {
        let mut state = make_state(1, "", 0);
        assert!(parse_commands("r=bob", "alice", &mut state, CommandContext::Live));
        assert_eq!(state.approved_by, "bob");
    }

    #[test]
    fn test_r_minus_revokes() {
        let mut state = make_state(1, "", 0);
        parse_commands("r+", "alice", &mut state, CommandContext::Live);
        assert!(parse_commands("r-", "alice", &mut state, CommandContext::Live));
        assert!(state.approved_by.is_empty());

        parse_commands("r=bob", "alice", &mut state, CommandContext::Live);
        parse_commands("r-", "alice", &mut state, CommandContext::Live);
        assert!(state.approved_by.is_empty());
    }

    #[test]
    fn test_priority_sets_value() {
        let mut state = make_state(1, "", 0);
        assert!(parse_commands("p=5", "alice", &mut state, CommandContext::Live));
        assert_eq!(state.priority, 5);
    }

    #[test]
    fn test_invalid_priority_matches_but_keeps_value() {
        let mut state = make_state(1, "", 3);
        assert!(parse_commands("p=oops", "alice", &mut state, CommandContext::Live));
        assert_eq!(state.priority, 3);
    }

    #[test]
    fn test_unrecognized_tokens_change_nothing() {
        let mut state = make_state(1, "", 0);
        let before = state.clone();
        assert!(!parse_commands("lgtm", "alice", &mut state, CommandContext::Live));
        assert_eq!(state, before);
    }

    #[test]
    fn test_multiple_tokens_in_prose() {
        let mut state = make_state(1, "", 0);
        let body = "Looks good to me.\n\nr+ p=2 thanks!";
        assert!(parse_commands(body, "bob", &mut state, CommandContext::Live));
        assert_eq!(state.approved_by, "bob");
        assert_eq!(state.priority, 2);
    }

    #[test]
    fn test_later_tokens_win() {
        let mut state = make_state(1, "", 0);
        parse_commands("r+ r-", "alice", &mut state, CommandContext::Live);
        assert!(state.approved_by.is_empty());
    }

    #[test]
    fn test_retry_resets_status_when_live() {
        let mut state = make_state(1, "alice", 0);
        state.start_testing("merge_1".to_string(), &["linux".to_string()]);
        state.status = BuildStatus::Failure;

        assert!(parse_commands("retry", "alice", &mut state, CommandContext::Live));
        assert_eq!(state.status, BuildStatus::Untested);
        assert!(state.merge_commit.is_none());
        assert!(state.build_results.is_empty());
    }

    #[test]
    fn test_retry_ignored_during_replay() {
        let mut state = make_state(1, "alice", 0);
        state.status = BuildStatus::Failure;

        assert!(!parse_commands("retry", "alice", &mut state, CommandContext::Replay));
        assert_eq!(state.status, BuildStatus::Failure);
    }

    #[test]
    fn test_replay_still_applies_approval() {
        let mut state = make_state(1, "", 0);
        assert!(parse_commands("retry r+", "alice", &mut state, CommandContext::Replay));
        assert_eq!(state.approved_by, "alice");
    }
}

mod state_test {
    use crate::common::make_state;
    use mergeq::queue::{BuildResult, BuildStatus};
    use mergeq::types::CommitState;

    fn testing_state() -> mergeq::queue::PullRequestState {
        let mut state = make_state(1, "alice", 0);
        state.start_testing(
            "merge_1".to_string(),
            &["linux".to_string(), "mac".to_string()],
        );
        state
    }

    #[test]
    fn test_start_testing_initializes_every_builder() {
        let state = testing_state();
        assert_eq!(state.status, BuildStatus::Testing);
        assert_eq!(state.merge_commit.as_deref(), Some("merge_1"));
        assert_eq!(state.build_results.len(), 2);
        assert!(
            state
                .build_results
                .values()
                .all(|r| *r == BuildResult::Unknown)
        );
        assert!(state.testing_since.is_some());
    }

    #[test]
    fn test_verdict_waits_for_all_builders() {
        let mut state = testing_state();
        assert!(state.record_build_result("linux", BuildResult::Success));
        assert_eq!(state.build_verdict(), None);

        assert!(state.record_build_result("mac", BuildResult::Success));
        assert_eq!(state.build_verdict(), Some(BuildStatus::Success));
    }

    #[test]
    fn test_any_failure_fails_once_all_reported() {
        let mut state = testing_state();
        state.record_build_result("mac", BuildResult::Failure);
        assert_eq!(state.build_verdict(), None);

        state.record_build_result("linux", BuildResult::Success);
        assert_eq!(state.build_verdict(), Some(BuildStatus::Failure));
    }

    #[test]
    fn test_pending_result_is_not_final() {
        let mut state = testing_state();
        state.record_build_result("linux", BuildResult::Success);
        state.record_build_result("mac", BuildResult::Pending);
        assert_eq!(state.build_verdict(), None);
    }

    #[test]
    fn test_unknown_builder_rejected() {
        let mut state = testing_state();
        assert!(!state.record_build_result("windows", BuildResult::Success));
        assert_eq!(state.build_results.len(), 2);
    }

    #[test]
    fn test_sync_head_drops_approval_and_build() {
        let mut state = testing_state();
        assert!(state.sync_head("head_1b".to_string()));
        assert_eq!(state.head_commit, "head_1b");
        assert!(!state.is_approved());
        assert_eq!(state.status, BuildStatus::Untested);
        assert!(state.merge_commit.is_none());
        assert!(state.testing_since.is_none());

        state.approved_by = "bob".to_string();
        assert!(!state.sync_head("head_1b".to_string()));
        assert_eq!(state.approved_by, "bob");
    }

    #[test]
    fn test_initial_status_from_commit_state() {
        assert_eq!(
            BuildStatus::from_commit_state(Some(CommitState::Pending)),
            BuildStatus::Testing
        );
        assert_eq!(
            BuildStatus::from_commit_state(Some(CommitState::Error)),
            BuildStatus::Failure
        );
        assert_eq!(BuildStatus::from_commit_state(None), BuildStatus::Untested);
    }
}

mod hold_test {
    use crate::common::make_state;
    use mergeq::queue::RepoQueue;

    #[test]
    fn test_hold_applies_to_current_head_only() {
        let mut queue = RepoQueue::new();
        queue.insert(make_state(1, "alice", 0));
        queue.hold(1, "merge conflict");

        assert_eq!(queue.hold_for(1).unwrap().reason, "merge conflict");

        queue.get_mut(1).unwrap().head_commit = "new_head".to_string();
        assert!(queue.hold_for(1).is_none());
    }

    #[test]
    fn test_release_and_remove_clear_hold() {
        let mut queue = RepoQueue::new();
        queue.insert(make_state(1, "alice", 0));
        queue.insert(make_state(2, "alice", 0));
        queue.hold(1, "boom");
        queue.hold(2, "boom");

        assert!(queue.release(1).is_some());
        assert!(queue.hold_for(1).is_none());

        queue.remove(2);
        queue.insert(make_state(2, "alice", 0));
        assert!(queue.hold_for(2).is_none());
    }
}

mod plan_test {
    use crate::common::{make_state, repo_config};
    use mergeq::merge::{merge_message, pending_description, plan_trial_merge};
    use mergeq::queue::BuildStatus;

    #[test]
    fn test_merge_message_format() {
        let message = merge_message("0123456789abcdef", "tmp", "alice");
        insta::assert_snapshot!(message, @r"
        Merge 0123456 into tmp

        Approved-by: alice
        ");
    }

    #[test]
    fn test_plan_uses_configured_branches() {
        let mut state = make_state(4, "bob", 0);
        state.head_commit = "fedcba9876543210".to_string();

        let plan = plan_trial_merge(&repo_config(), &state).unwrap();

        assert_eq!(plan.number, 4);
        assert_eq!(plan.target_branch, "master");
        assert_eq!(plan.scratch_branch, "tmp");
        assert_eq!(plan.ci_branch, "buildbot");
        assert_eq!(plan.builders, vec!["linux", "mac"]);
        assert!(plan.commit_message.starts_with("Merge fedcba9 into tmp"));
        assert!(plan.commit_message.ends_with("Approved-by: bob"));
    }

    #[test]
    fn test_plan_requires_approval() {
        assert!(plan_trial_merge(&repo_config(), &make_state(1, "", 0)).is_none());
    }

    #[test]
    fn test_plan_requires_untested() {
        let mut state = make_state(1, "alice", 0);
        state.status = BuildStatus::Failure;
        assert!(plan_trial_merge(&repo_config(), &state).is_none());
    }

    #[test]
    fn test_pending_description_names_commit() {
        assert_eq!(pending_description("merge_1"), "Testing candidate merge_1...");
    }
}

mod bootstrap_status_test {
    use mergeq::bootstrap::initial_status;
    use mergeq::queue::BuildStatus;
    use mergeq::types::CommitStatus;

    fn status(state: &str, context: &str) -> CommitStatus {
        CommitStatus {
            state: state.to_string(),
            context: context.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_newest_own_status_wins() {
        let statuses = vec![
            status("failure", "other-ci"),
            status("pending", "merge-queue"),
            status("success", "merge-queue"),
        ];
        assert_eq!(initial_status(&statuses, "merge-queue"), BuildStatus::Testing);
    }

    #[test]
    fn test_foreign_statuses_are_informational() {
        let statuses = vec![status("failure", "other-ci")];
        assert_eq!(initial_status(&statuses, "merge-queue"), BuildStatus::Untested);
    }

    #[test]
    fn test_unrecognized_state_is_untested() {
        let statuses = vec![status("queued", "merge-queue")];
        assert_eq!(initial_status(&statuses, "merge-queue"), BuildStatus::Untested);
    }
}
