// tests/pipeline_scenarios.rs

mod common;

use std::path::PathBuf;

use serde_yaml::Value;

use common::{args, config, Harness, BRANCH};
use minipipe::{run_with, RunOutcome};
use minipipe_test_utils::{document_text, with_timeout, GitStep, JobBuilder};

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).unwrap()
}

fn keys(doc: &Value) -> Vec<String> {
    doc.as_mapping()
        .unwrap()
        .keys()
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect()
}

fn abc_documents() -> (String, String) {
    let ab = document_text(&[
        ("A", JobBuilder::script("run a").needs(&["B"]).build()),
        ("B", JobBuilder::script("run b").build()),
    ]);
    let c = document_text(&[("C", JobBuilder::script("run c").build())]);
    (ab, c)
}

#[tokio::test]
async fn target_keeps_its_needs_and_fills_emptied_documents() {
    let (ab, c) = abc_documents();
    let h = Harness::new(&[("ab.yml", &ab), ("c.yml", &c)]);

    let outcome = with_timeout(run_with(&args(&["-j", "A"]), config(), h.collaborators()))
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Published { ref branch, .. } if branch == BRANCH));

    let commits = h.vcs.commits();
    assert_eq!(commits.len(), 1);
    let files = &commits[0].files;

    let ab_out = yaml(&files[&PathBuf::from("gitlab/ab.yml")]);
    assert_eq!(keys(&ab_out), vec!["A", "B"]);

    let c_out = yaml(&files[&PathBuf::from("gitlab/c.yml")]);
    assert_eq!(c_out, yaml(".emptyPlaceHolder: {variables: []}"));

    // The working tree is back to what it was.
    assert_eq!(h.document("ab.yml"), ab);
    assert_eq!(h.document("c.yml"), c);
}

#[tokio::test]
async fn subjob_target_narrows_the_matrix() {
    let pkg = document_text(&[(
        "pkg",
        JobBuilder::script("make pkg")
            .matrix_axis("FILE", &["f1", "f2", "f3"])
            .build(),
    )]);
    let h = Harness::new(&[("pkg.yml", &pkg)]);

    let outcome = run_with(&args(&["-j", "pkg:[f2]", "--dry-run"]), config(), h.collaborators())
        .await
        .unwrap();

    let RunOutcome::DryRun(outputs) = outcome else {
        panic!("expected a dry run");
    };
    assert_eq!(
        outputs[0].jobs()["pkg"]["parallel"],
        yaml("{matrix: [{FILE: [f2]}]}")
    );
    // dry runs never touch git
    assert!(h.vcs.calls().is_empty());
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn repeat_follows_the_three_shapes() {
    let jobs = document_text(&[
        ("plain", JobBuilder::script("x").build()),
        ("ints", JobBuilder::script("x").parallel(4).build()),
        (
            "mat",
            JobBuilder::script("x")
                .matrix_axis("TESTFILE", &["f1", "f2"])
                .build(),
        ),
    ]);
    let h = Harness::new(&[("jobs.yml", &jobs)]);

    let outcome = run_with(
        &args(&["-j", "plain, ints, mat", "-r", "3", "--dry-run"]),
        config(),
        h.collaborators(),
    )
    .await
    .unwrap();
    let RunOutcome::DryRun(outputs) = outcome else {
        panic!("expected a dry run");
    };
    let out = outputs[0].jobs();

    assert_eq!(out["plain"]["parallel"], yaml("{matrix: [{REPEAT: [0, 1, 2]}]}"));
    assert_eq!(out["ints"]["parallel"], Value::from(12u64));
    assert_eq!(
        out["mat"]["parallel"],
        yaml("{matrix: [{TESTFILE: [f1, f2], REPEAT: [0, 1, 2]}]}")
    );
}

#[tokio::test]
async fn templates_and_globals_survive() {
    let text = r#"
stages: [build, test]
variables:
  GIT_DEPTH: "1"
.base:
  image: alpine
  before_script: !reference [.setup, script]
.setup:
  script: [echo setup]
build:
  extends: .base
  script: [make]
lint:
  script: [make lint]
"#;
    let h = Harness::new(&[("ci.yml", text)]);

    let outcome = run_with(&args(&["-j", "build", "--dry-run"]), config(), h.collaborators())
        .await
        .unwrap();
    let RunOutcome::DryRun(outputs) = outcome else {
        panic!("expected a dry run");
    };
    let names: Vec<&str> = outputs[0].job_names().collect();
    assert_eq!(names, vec!["stages", "variables", ".base", ".setup", "build"]);
}

#[tokio::test]
async fn published_commit_holds_rewrite_and_push_starts_pipeline() {
    let (ab, c) = abc_documents();
    let h = Harness::new(&[("ab.yml", &ab), ("c.yml", &c)])
        .with_remote(|r| r.with_url("https://gitlab.com/g/p/-/pipelines/42"));

    let outcome = run_with(&args(&["-j", "C", "-n"]), config(), h.collaborators())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Published {
            branch: BRANCH.to_string(),
            url: Some("https://gitlab.com/g/p/-/pipelines/42".to_string()),
        }
    );

    let commit = &h.vcs.commits()[0];
    assert!(commit.no_verify);
    assert!(commit.message.starts_with("[Don't merge this commit!] minimum pipeline for: C"));
    assert_eq!(
        h.vcs.pushes(),
        vec![("origin".to_string(), BRANCH.to_string(), commit.id.clone())]
    );
    assert_eq!(
        h.remote.calls(),
        vec![
            format!("has_open_merge_request {BRANCH}"),
            format!("run_pipeline {BRANCH}"),
            format!("pipeline_status {BRANCH}"),
        ]
    );
    // reset back to the pre-run commit
    assert_eq!(h.vcs.head(), "c0");
    assert_eq!(h.vcs.count(GitStep::Reset), 1);
}

#[tokio::test]
async fn open_merge_request_skips_manual_pipeline() {
    let (ab, c) = abc_documents();
    let h = Harness::new(&[("ab.yml", &ab), ("c.yml", &c)])
        .with_remote(|r| r.with_open_merge_request());

    run_with(&args(&["-j", "A"]), config(), h.collaborators())
        .await
        .unwrap();

    assert!(!h.remote.calls().iter().any(|c| c.starts_with("run_pipeline")));
}

#[tokio::test]
async fn uncommitted_work_is_stashed_and_popped() {
    let (ab, c) = abc_documents();
    let h = Harness::new(&[("ab.yml", &ab), ("c.yml", &c)]);
    // edited after the last commit
    let edited = format!("{c}D:\n  script: [run d]\n");
    h.fs.add_file("gitlab/c.yml", edited.as_str());

    run_with(&args(&["-j", "D"]), config(), h.collaborators())
        .await
        .unwrap();

    assert_eq!(h.vcs.count(GitStep::Stash), 1);
    assert_eq!(h.vcs.count(GitStep::StashPop), 1);
    assert!(!h.vcs.has_stash());
    assert_eq!(h.document("c.yml"), edited);

    // the commit was built from the edited documents
    let files = &h.vcs.commits()[0].files;
    let c_out = yaml(&files[&PathBuf::from("gitlab/c.yml")]);
    assert_eq!(keys(&c_out), vec!["D"]);
}
