//! Path → artifact kind inference.

use flowsync_core::ArtifactKind;
use rstest::rstest;

#[rstest]
#[case("f/etl/extract.py", Some(ArtifactKind::Script))]
#[case("f/etl/extract.pg.sql", Some(ArtifactKind::Script))]
#[case("f/etl/extract.script.yaml", Some(ArtifactKind::Script))]
#[case("f/etl/extract.script.lock", Some(ArtifactKind::Script))]
#[case("f/etl/deploy.playbook.yml", Some(ArtifactKind::Script))]
#[case("f/etl/daily.flow/flow.yaml", Some(ArtifactKind::Flow))]
#[case("f/etl/daily.flow/step_one.inline_script.ts", Some(ArtifactKind::Flow))]
#[case("f/etl/board.app/app.yaml", Some(ArtifactKind::App))]
#[case("f/etl/folder.meta.yaml", Some(ArtifactKind::Folder))]
#[case("f/etl/db.resource.json", Some(ArtifactKind::Resource))]
#[case("postgresql.resource-type.yaml", Some(ArtifactKind::ResourceType))]
#[case("u/alice/token.variable.yaml", Some(ArtifactKind::Variable))]
#[case("f/etl/nightly.schedule.yaml", Some(ArtifactKind::Schedule))]
#[case("wmill.yaml", None)]
#[case("README.md", None)]
fn infers_kind_from_path(#[case] path: &str, #[case] expected: Option<ArtifactKind>) {
    assert_eq!(ArtifactKind::from_path(path), expected);
}
