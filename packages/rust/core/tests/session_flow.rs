//! End-to-end flows through `GuideSession`: search, walk, fail, fall back.

use stepguide_core::{FallbackDecision, GuideSession, RunnerPhase, StepRef, TokenOverlapMatcher};
use stepguide_retrieval::{KeywordRetrieval, KnowledgeBase, builtin_catalog};
use stepguide_shared::{AppConfig, Article, Escalation, FailureReason, FallbackPath, Step};

fn make_step(id: &str, text: &str) -> Step {
    Step {
        id: id.into(),
        text: text.into(),
        expected_result: None,
        say_to_customer: None,
    }
}

fn session_over(articles: Vec<Article>) -> GuideSession {
    let kb = KnowledgeBase::new(articles).expect("valid articles");
    GuideSession::new(
        Box::new(KeywordRetrieval::new(kb)),
        Box::new(TokenOverlapMatcher::default()),
        3,
    )
}

#[test]
fn two_step_article_escalates_when_nothing_else_applies() {
    let article_a = Article {
        id: "kb-a".into(),
        title: "Article A".into(),
        tags: vec![],
        product: String::new(),
        summary: String::new(),
        keywords: vec![],
        prechecks: vec![],
        steps: vec![make_step("a1", "first"), make_step("a2", "second")],
        fallbacks: vec![],
        escalation: Some(Escalation {
            when: "always".into(),
            target: "Tier2".into(),
        }),
    };
    let mut session = session_over(vec![article_a]);

    let start = session.start("kb-a").expect("start");
    assert_eq!(start.total_steps, 2);

    let outcome = session.continue_step(None).expect("continue");
    assert!(!outcome.completed);
    let step2 = outcome.next_step.expect("second step");
    assert_eq!(step2.step_id, "a2");
    assert!(step2.is_last);

    let decision = session
        .report_failure(FailureReason::Other, Some("x"))
        .expect("report failure");
    let FallbackDecision::Escalation { escalation: Some(esc) } = decision else {
        panic!("expected escalation, got {}", decision.kind());
    };
    assert_eq!(esc.when, "always");
    assert_eq!(esc.target, "Tier2");

    let summary = session.summary().expect("summary");
    assert_eq!(summary.failure_history.len(), 1);
    assert_eq!(summary.failure_history[0].step_id, "a2");
    assert_eq!(summary.completed_step_ids(), vec!["a1"]);
}

#[test]
fn same_article_fallback_skips_already_done_steps() {
    let mut session = GuideSession::from_config(&AppConfig::default()).expect("session");

    let outcome = session.search("Outlook email smtp");
    let top = outcome.matches().first().expect("a match");
    assert_eq!(top.article.id.as_str(), "kb-email-not-sending");
    assert!(!outcome.low_confidence());

    session.start("kb-email-not-sending").expect("start");
    let shown = |id: &str| StepRef::new("kb-email-not-sending", id);
    session.continue_step(Some(&shown("email-1"))).expect("continue");
    session.continue_step(Some(&shown("email-2"))).expect("continue");

    let target = {
        let decision = session
            .report_failure(FailureReason::DidNotWork, Some("safe mode did not help"))
            .expect("report");
        assert_eq!(decision.kind(), "same-article");
        decision.target().expect("fallback target")
    };
    assert_eq!(target.fallback_id, "fb-webmail");

    let switched = session.switch_to_fallback(&target).expect("switch");
    // "Confirm ... internet" was done on the main path; the webmail step is new,
    // so the later "Outbox" repeat is not skipped.
    assert_eq!(switched.skipped, 1);
    assert_eq!(switched.current_step.map(|s| s.step_id), Some("email-fb-2".into()));
    assert_eq!(session.take_skipped_notice(), Some(1));
    assert_eq!(session.take_skipped_notice(), None);

    session.continue_step(Some(&shown("email-fb-2"))).expect("continue");
    let repeat = session.current_step().expect("current");
    assert_eq!(repeat.step_id, "email-fb-3");
    assert_eq!(repeat.path.as_str(), "fb-webmail");
}

#[test]
fn cross_article_fallback_moves_the_session() {
    let mut session = GuideSession::from_config(&AppConfig::default()).expect("session");
    session.start("kb-vpn-connect").expect("start");
    session.continue_step(None).expect("continue");

    let target = {
        let decision = session
            .report_failure(FailureReason::NoAccess, Some("portal says access denied"))
            .expect("report");
        let FallbackDecision::CrossArticle { article, fallback } = &decision else {
            panic!("expected cross-article, got {}", decision.kind());
        };
        assert_eq!(article.id.as_str(), "kb-password-reset");
        assert_eq!(fallback.id, "fb-self-service");
        decision.target().expect("target")
    };

    let switched = session.switch_to_fallback(&target).expect("switch");
    assert_eq!(switched.skipped, 0);
    assert_eq!(
        session.active_article().map(|a| a.id.as_str()),
        Some("kb-password-reset")
    );

    session.continue_step(None).expect("continue");
    let last = session.continue_step(None).expect("continue");
    assert!(last.completed);
    assert_eq!(session.phase(), RunnerPhase::Complete);

    let summary = session.summary().expect("summary");
    assert_eq!(summary.attempted_paths.len(), 2);
    assert_eq!(summary.attempted_paths[0].article_id.as_str(), "kb-vpn-connect");
    assert_eq!(
        summary.completed_steps,
        vec![
            StepRef::new("kb-vpn-connect", "vpn-1"),
            StepRef::new("kb-password-reset", "pw-fb-1"),
            StepRef::new("kb-password-reset", "pw-fb-2"),
        ]
    );
    assert_eq!(summary.failure_history[0].article_id.as_str(), "kb-vpn-connect");
}

#[test]
fn double_click_does_not_double_advance() {
    let mut session = GuideSession::from_config(&AppConfig::default()).expect("session");
    let first = session
        .start("kb-printer-offline")
        .expect("start")
        .first_step
        .expect("first step");

    session.continue_step(Some(&first.step_ref())).expect("continue");
    let dup = session.continue_step(Some(&first.step_ref())).expect("duplicate");
    assert!(dup.stale);
    assert_eq!(session.runner().state().expect("state").current_step_index, 1);
}

#[test]
fn reset_clears_everything_before_restart() {
    let articles = builtin_catalog().expect("catalog");
    let mut session = session_over(articles);

    session.start("kb-printer-offline").expect("start");
    session.continue_step(None).expect("continue");
    session
        .report_failure(FailureReason::ErrorMessage, None)
        .expect("report");
    session.reset();

    session.start("kb-printer-offline").expect("restart");
    let summary = session.summary().expect("summary");
    assert!(summary.completed_steps.is_empty());
    assert!(summary.failure_history.is_empty());
    assert_eq!(summary.attempted_paths.len(), 1);
}

#[test]
fn back_on_first_step_is_reported_not_fatal() {
    let mut session = GuideSession::from_config(&AppConfig::default()).expect("session");
    session.start("kb-teams-audio").expect("start");
    assert!(session.back().is_err());

    session.continue_step(None).expect("continue");
    let back = session.back().expect("back").expect("step");
    assert_eq!(back.step_id, "teams-1");
}

#[test]
fn fallback_path_with_every_step_done_completes_at_once() {
    let article = Article {
        id: "kb-x".into(),
        title: "X".into(),
        tags: vec![],
        product: String::new(),
        summary: String::new(),
        keywords: vec![],
        prechecks: vec![],
        steps: vec![make_step("x1", "reboot")],
        fallbacks: vec![FallbackPath {
            id: "fb-x".into(),
            condition: "reboot did not help".into(),
            steps: vec![make_step("xf1", "reboot")],
        }],
        escalation: None,
    };
    let mut session = session_over(vec![article]);
    session.start("kb-x").expect("start");
    session.continue_step(None).expect("continue");

    let target = session
        .report_failure(FailureReason::DidNotWork, None)
        .expect("report")
        .target()
        .expect("target");
    let switched = session.switch_to_fallback(&target).expect("switch");
    assert!(switched.completed);
    assert!(session.is_complete());
}
