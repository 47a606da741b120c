//! End-to-end behavior of the harness against the in-memory driver.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use vigia::mock::{MockDocument, MockLauncher, MockNode, MockSite};
use vigia::{
    ArtifactKind, Driver, ErrorKind, FrameHop, HarnessError, Launcher, LocatorSpec, Reporter,
    Resolver, RouteTable, RunnerOptions, Scenario, ScenarioRunner, ScreenshotScope, Session,
    SessionConfig, SessionManager, Step, SuiteRunner, UrlPattern, VerdictStatus,
};

const APP: &str = "http://localhost:5173/";

/// Municipal page with the chat widget: a shadow host whose shadow root holds
/// the widget iframe, which attaches `mount` after navigation
fn widget_site(mount: Duration) -> MockSite {
    let chat = MockDocument::new("http://localhost:5173/iframe?widget=1")
        .title("Chat")
        .child(
            MockNode::new("div").id("menu").children([
                MockNode::button("Hacer un Reclamo").reveals("tipos"),
                MockNode::button("Consultar Estado"),
            ]),
        )
        .child(
            MockNode::new("section")
                .id("tipos")
                .hidden()
                .child(MockNode::new("h2").text("Tipos de Reclamo")),
        );
    MockSite::new().page(
        UrlPattern::Prefix("http://localhost:5173".into()),
        MockDocument::new(APP)
            .title("Municipio")
            .child(MockNode::new("h1").text("Municipio"))
            .child(
                MockNode::new("div")
                    .id("chatboc-widget-container")
                    .shadow([MockNode::iframe(chat).attr("name", "chatboc").mounts_after(mount)]),
            ),
    )
}

fn in_widget(spec: LocatorSpec) -> LocatorSpec {
    spec.in_frame(FrameHop::UrlContains("/iframe".into()))
}

fn options(dir: &std::path::Path) -> RunnerOptions {
    RunnerOptions::default()
        .with_base_url("http://localhost:5173")
        .with_artifact_dir(dir)
}

async fn session(site: MockSite) -> Session<vigia::mock::MockDriver> {
    let config = SessionConfig::default();
    let driver = MockLauncher::new(site)
        .launch(&config, &RouteTable::new())
        .await
        .unwrap();
    Session::new(driver, config)
}

mod lifecycle {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_release_once_on_pass_fail_and_panic() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SessionManager::new(MockLauncher::new(widget_site(Duration::ZERO)));
        let stats = manager.launcher().stats();
        let config = SessionConfig::default();
        let routes = RouteTable::new();

        for steps in [
            vec![Step::navigate("/")],
            vec![
                Step::navigate("/"),
                Step::click(LocatorSpec::css("#nope")).with_timeout(Duration::from_millis(100)),
            ],
        ] {
            let scenario = Scenario::builder("lifecycle").steps(steps).build().unwrap();
            let runner = ScenarioRunner::new(options(dir.path()));
            manager
                .with_session(&config, &routes, move |s| {
                    async move { runner.run(s, &scenario).await }.boxed()
                })
                .await
                .unwrap();
        }
        assert_eq!((stats.launched(), stats.closed()), (2, 2));

        let panicked = AssertUnwindSafe(manager.with_session::<(), _>(&config, &routes, |s| {
            async move {
                s.driver().navigate(APP).await.unwrap();
                panic!("body blew up");
            }
            .boxed()
        }))
        .catch_unwind()
        .await;
        assert!(panicked.is_err());
        assert_eq!((stats.launched(), stats.closed()), (3, 3));
    }

    #[tokio::test]
    async fn test_launch_failure_is_environment_error() {
        let suite = SuiteRunner::new(
            MockLauncher::new(MockSite::new()).failing("no chromium binary"),
            ScenarioRunner::new(RunnerOptions::default()),
            SessionConfig::default(),
        );
        let scenario = Scenario::builder("x").step(Step::navigate(APP)).build().unwrap();
        let err = suite.run(&[scenario]).await.into_result().unwrap_err();
        assert!(matches!(err, HarnessError::Environment { .. }), "{err}");
        assert_eq!(err.kind(), ErrorKind::Environment);
    }
}

mod resolution {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_resolve_is_idempotent() {
        let session = session(widget_site(Duration::ZERO)).await;
        session.driver().navigate(APP).await.unwrap();
        let resolver = Resolver::default();
        let spec = in_widget(LocatorSpec::role_named("button", "Hacer un Reclamo"));

        let first = resolver
            .resolve(session.driver(), &spec, Duration::from_secs(1))
            .await
            .unwrap();
        let second = resolver
            .resolve(session.driver(), &spec, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(first.same_element(&second));
        assert!(session.driver().history().iter().all(|c| !c.starts_with("click")));
        session.release().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_frame_within_timeout_resolves() {
        let session = session(widget_site(Duration::from_millis(900))).await;
        session.driver().navigate(APP).await.unwrap();
        let spec = in_widget(LocatorSpec::role_named("button", "Hacer un Reclamo"));
        let handle = Resolver::default()
            .resolve(session.driver(), &spec, Duration::from_millis(1000))
            .await
            .unwrap();
        assert_eq!(handle.snapshot().tag, "button");
        session.release().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_after_timeout_is_not_found() {
        let session = session(widget_site(Duration::from_millis(1100))).await;
        session.driver().navigate(APP).await.unwrap();
        let spec = in_widget(LocatorSpec::role_named("button", "Hacer un Reclamo"));
        let err = Resolver::default()
            .resolve(session.driver(), &spec, Duration::from_millis(1000))
            .await
            .unwrap_err();
        match err {
            HarnessError::NotFound {
                locator,
                elapsed,
                last_seen_count,
            } => {
                assert!(locator.contains("not found"), "{locator}");
                assert_eq!(elapsed, Duration::from_millis(1000));
                assert_eq!(last_seen_count, 0);
            }
            other => panic!("expected NotFound, got {other}"),
        }
        session.release().await.unwrap();
    }
}

mod scenarios {
    use super::*;

    const WIDGET_FLOW: &str = r#"
name: Reclamo desde el widget
query: { widget: "1" }
steps:
  - action: navigate
    url: /
  - action: click
    locator:
      frames: [{ url_contains: /iframe }]
      role: button
      name: Hacer un Reclamo
  - action: wait_for_visible
    locator:
      frames: [{ url_contains: /iframe }]
      text: Tipos de Reclamo
    timeout_ms: 2000
"#;

    #[tokio::test(start_paused = true)]
    async fn test_widget_flow_passes() {
        let dir = tempfile::tempdir().unwrap();
        let suite = SuiteRunner::new(
            MockLauncher::new(widget_site(Duration::from_millis(500))),
            ScenarioRunner::new(options(dir.path())),
            SessionConfig::default(),
        );
        let stats = suite.manager().launcher().stats();
        let scenario = Scenario::from_yaml_str(WIDGET_FLOW).unwrap();
        let verdicts = suite.run(&[scenario]).await.into_result().unwrap();
        assert!(verdicts[0].passed(), "{:?}", verdicts[0].failure());
        assert_eq!(verdicts[0].steps().len(), 3);
        assert_eq!(stats.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_panel_without_click_fails_on_that_step() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(widget_site(Duration::from_millis(500))).await;
        let scenario = Scenario::builder("sin click")
            .step(Step::navigate("/"))
            .step(
                Step::wait_for_visible(in_widget(LocatorSpec::text("Tipos de Reclamo")))
                    .with_timeout(Duration::from_millis(2000)),
            )
            .build()
            .unwrap();
        let verdict = ScenarioRunner::new(options(dir.path()))
            .run(&session, &scenario)
            .await;
        assert_eq!(verdict.status(), VerdictStatus::Failed);
        let failure = verdict.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::NotFound);
        assert!(failure.message.contains("present but not visible"), "{}", failure.message);
        session.release().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_halts_at_failing_step_and_reports_it() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(widget_site(Duration::ZERO)).await;
        let scenario = Scenario::builder("halt")
            .steps([
                Step::navigate("/"),
                Step::assert_text(LocatorSpec::css("h1"), "Provincia"),
                Step::click(in_widget(LocatorSpec::role_named("button", "Hacer un Reclamo"))),
            ])
            .build()
            .unwrap();
        let verdict = ScenarioRunner::new(options(dir.path()))
            .run(&session, &scenario)
            .await;
        assert_eq!(verdict.status(), VerdictStatus::Failed);
        assert_eq!(verdict.failed_step(), Some(1));
        assert_eq!(verdict.failure().unwrap().kind, ErrorKind::Assertion);
        assert!(!session.driver().was_called("click:"));

        let mut reporter = Reporter::new(Vec::new());
        let report = reporter.finalize(verdict);
        assert!(report.summary.contains("step 2/3"), "{}", report.summary);
        assert!(report.summary.contains("assert_text"), "{}", report.summary);
        session.release().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_assert_not_text_is_complement() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScenarioRunner::new(options(dir.path()));
        for (text, positive_passes) in [("Municipio", true), ("Provincia", false)] {
            let h1 = LocatorSpec::css("h1");
            let positive = Scenario::builder("pos")
                .steps([Step::navigate("/"), Step::assert_text(h1.clone(), text)])
                .build()
                .unwrap();
            let negative = Scenario::builder("neg")
                .steps([Step::navigate("/"), Step::assert_not_text(h1, text)])
                .build()
                .unwrap();

            let session = session(widget_site(Duration::ZERO)).await;
            let pos = runner.run(&session, &positive).await;
            let neg = runner.run(&session, &negative).await;
            assert_eq!(pos.passed(), positive_passes, "{text}");
            assert_eq!(neg.passed(), !positive_passes, "{text}");
            session.release().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_screenshot_creates_dirs_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("shots/widget/home.png");
        let scenario = Scenario::builder("capturas")
            .steps([
                Step::navigate("/"),
                Step::screenshot(&target, ScreenshotScope::Viewport),
            ])
            .build()
            .unwrap();
        let runner = ScenarioRunner::new(options(dir.path()));
        let mut reporter = Reporter::new(Vec::new());

        for _ in 0..2 {
            let session = session(widget_site(Duration::ZERO)).await;
            let verdict = runner.run(&session, &scenario).await;
            assert!(verdict.passed(), "{:?}", verdict.failure());
            assert_eq!(verdict.artifact_paths(ArtifactKind::Screenshot), vec![target.as_path()]);
            let report = reporter.finalize(verdict);
            assert_eq!(report.written, vec![target.clone()]);
            session.release().await.unwrap();
        }
        let bytes = std::fs::read(&target).unwrap();
        assert!(bytes.starts_with(&vigia::mock::PNG_MAGIC));
        let entries = std::fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}

mod shipped_files {
    use super::*;
    use std::path::Path;

    fn repo_root() -> &'static Path {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(Path::parent)
            .unwrap()
    }

    #[test]
    fn test_demo_scenarios_parse() {
        let dir = repo_root().join("scenarios");
        let mut loaded = 0;
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let scenario = Scenario::load(&path).unwrap();
            assert!(!scenario.steps.is_empty(), "{}", path.display());
            loaded += 1;
        }
        assert!(loaded >= 2);
    }

    #[test]
    fn test_demo_config_parses() {
        let config = vigia::HarnessConfig::load(repo_root().join("vigia.yaml")).unwrap();
        assert!(config.session.console_logging);
    }
}
