//! Integration tests for the package pipeline
//!
//! Drives the library pipeline against a mock HTTP server with a recording
//! process runner, so no real build tools are needed.

mod common;

use std::sync::{Arc, Mutex};

use common::{tar_gz, TestProject};
use extbuild::core::fetch::Fetcher;
use extbuild::core::package::{parse_yaml, PackageSpec};
use extbuild::core::pipeline::{Pipeline, PipelineEvent, Stage, StageError};
use extbuild::core::workspace::Workspace;
use extbuild::error::{BuildError, ProcessError};
use extbuild::infra::download::DownloadManager;
use extbuild::infra::process::{CommandRunner, CommandSpec};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records every command; fails commands whose program is `fail_program`
#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_program: Option<&'static str>,
}

impl RecordingRunner {
    fn failing(program: &'static str) -> Self {
        Self {
            fail_program: Some(program),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        self.calls.lock().unwrap().push(command.clone());
        if self.fail_program == Some(command.program.as_str()) {
            return Err(ProcessError::NonZeroExit {
                command: command.command_line(),
                code: Some(2),
                stderr: "configure: error: C compiler cannot create executables".to_string(),
            });
        }
        Ok(())
    }
}

async fn zlib_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zlib-1.2.11.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(tar_gz(
            "zlib-1.2.11",
            &[("configure", "#!/bin/sh\n"), ("zlib.h", "/* zlib */\n")],
        )))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn zlib_list(server: &MockServer) -> Vec<PackageSpec> {
    let yaml = format!(
        concat!(
            "- package:\n",
            "    uri: {}/zlib-1.2.11.tar.gz\n",
            "    name: zlib\n",
            "    method: configure\n",
            "    flags: --static\n",
        ),
        server.uri()
    );
    parse_yaml(&yaml, 4).unwrap()
}

fn pipeline<'a>(
    project: &TestProject,
    runner: &'a RecordingRunner,
) -> Pipeline<&'a RecordingRunner> {
    let pipeline = Pipeline::new(Workspace::new(project.path()), runner)
        .with_fetcher(Fetcher::new(DownloadManager::with_config(3, 0)));
    pipeline.prepare(false).unwrap();
    pipeline
}

// ============================================
// End-to-end scenario
// ============================================

#[tokio::test]
async fn test_configure_package_end_to_end() {
    let server = zlib_server().await;
    let project = TestProject::new();
    let runner = RecordingRunner::default();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let recorded = stages.clone();

    let summary = pipeline(&project, &runner)
        .on_event(Arc::new(move |event| {
            if let PipelineEvent::StageStarted { stage, .. } = event {
                recorded.lock().unwrap().push(*stage);
            }
        }))
        .run(&zlib_list(&server))
        .await
        .unwrap();

    assert_eq!(
        *stages.lock().unwrap(),
        vec![
            Stage::Fetch,
            Stage::Unpack,
            Stage::Configure,
            Stage::Build,
            Stage::Install
        ]
    );

    // Unpacked with the wrapper directory stripped
    assert!(project.file_exists("external/zlib.gz"));
    assert_eq!(project.read_file("external/zlib/zlib.h"), "/* zlib */\n");
    assert!(!project.file_exists("external/zlib/zlib-1.2.11"));

    let prefix = project.path().join("ros_toolchain_install");
    let lines: Vec<String> = runner.calls().iter().map(CommandSpec::command_line).collect();
    assert_eq!(
        lines,
        vec![
            format!("./configure --prefix={} --static", prefix.display()),
            "make -j4".to_string(),
            "make install".to_string(),
        ]
    );
    assert!(runner
        .calls()
        .iter()
        .all(|c| c.cwd == project.path().join("external/zlib")));
    assert!(runner.calls()[0].env["PYTHONPATH"]
        .starts_with(&prefix.join("lib/python2.7/site-packages").display().to_string()));

    assert_eq!(summary.packages, 1);
    assert_eq!(summary.fetched, 1);
}

#[tokio::test]
async fn test_second_run_skips_fetch() {
    let server = zlib_server().await;
    let project = TestProject::new();
    let packages = zlib_list(&server);

    let first = RecordingRunner::default();
    pipeline(&project, &first).run(&packages).await.unwrap();

    let second = RecordingRunner::default();
    let summary = pipeline(&project, &second).run(&packages).await.unwrap();

    assert_eq!(summary.already_fetched, 1);
    assert_eq!(summary.fetched, 0);
    assert_eq!(second.calls().len(), 3);
    // Mock expects exactly one request and verifies on drop
}

// ============================================
// Failure propagation
// ============================================

#[tokio::test]
async fn test_configure_failure_aborts_run() {
    let server = zlib_server().await;
    let project = TestProject::new();
    let runner = RecordingRunner::failing("./configure");

    let err = pipeline(&project, &runner)
        .run(&zlib_list(&server))
        .await
        .unwrap_err();

    assert_eq!(err.package, "zlib");
    assert_eq!(err.stage, Stage::Configure);
    assert!(matches!(
        err.error,
        StageError::Build(BuildError::StepFailed { .. })
    ));
    let message = err.to_string();
    assert!(message.contains("zlib"));
    assert!(message.contains("configure"));

    // Neither build nor install ran
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn test_failure_stops_before_later_packages() {
    let server = zlib_server().await;
    let project = TestProject::new();
    let runner = RecordingRunner::failing("./configure");

    let yaml = format!(
        "- package:\n    uri: {0}/zlib-1.2.11.tar.gz\n    name: zlib\n    method: configure\n\
         - package:\n    uri: {0}/other.tar.gz\n    name: other\n    method: make\n",
        server.uri()
    );
    let packages = parse_yaml(&yaml, 4).unwrap();

    let err = pipeline(&project, &runner).run(&packages).await.unwrap_err();

    assert_eq!(err.package, "zlib");
    assert!(!project.file_exists("external/other.gz"));
}

#[tokio::test]
async fn test_fetch_failure_names_uri() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;
    let project = TestProject::new();
    let runner = RecordingRunner::default();

    let uri = format!("{}/gone-1.0.tar.gz", server.uri());
    let yaml = format!("- package:\n    uri: {uri}\n    name: gone\n    method: make\n");
    let packages = parse_yaml(&yaml, 4).unwrap();

    let err = pipeline(&project, &runner).run(&packages).await.unwrap_err();

    assert_eq!(err.stage, Stage::Fetch);
    assert!(err.to_string().contains(&uri));
    assert!(!project.file_exists("external/gone.gz"));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_unsupported_archive_fails_at_unpack() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"Rar!".to_vec()))
        .mount(&server)
        .await;
    let project = TestProject::new();
    let runner = RecordingRunner::default();

    let yaml = format!(
        "- package:\n    uri: {}/thing.rar\n    name: thing\n    method: make\n",
        server.uri()
    );
    let packages = parse_yaml(&yaml, 4).unwrap();

    let err = pipeline(&project, &runner).run(&packages).await.unwrap_err();

    assert_eq!(err.stage, Stage::Unpack);
    assert!(err.to_string().contains("Unknown file compression type"));
    assert!(runner.calls().is_empty());
}

// ============================================
// Package names
// ============================================

#[tokio::test]
async fn test_empty_name_never_touches_scratch_area() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    let project = TestProject::new();
    project.create_file("external/other.gz", "keep");
    let runner = RecordingRunner::default();

    let yaml = format!(
        "- package:\n    uri: {}/thing.zip\n    name: \"\"\n    method: make\n",
        server.uri()
    );
    let packages = parse_yaml(&yaml, 4).unwrap();

    let err = pipeline(&project, &runner).run(&packages).await.unwrap_err();

    assert!(matches!(err.error, StageError::Package(_)));
    assert_eq!(project.read_file("external/other.gz"), "keep");
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_escaping_name_rejected_before_first_package() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;
    let project = TestProject::new();
    project.create_file("patches/fix.patch", "--- a\n");
    let runner = RecordingRunner::default();

    let mut packages = zlib_list(&server);
    let mut escaping = packages[0].clone();
    escaping.name = "../patches".to_string();
    packages.push(escaping);

    let err = pipeline(&project, &runner).run(&packages).await.unwrap_err();

    assert_eq!(err.package, "../patches");
    assert!(err.to_string().contains("Invalid package name"));
    assert!(project.file_exists("patches/fix.patch"));
    // zlib was not started either
    assert!(!project.file_exists("external/zlib.gz"));
    assert!(runner.calls().is_empty());
}
