use std::sync::Arc;

use codeset_studio::*;
use tempfile::tempdir;

#[tokio::test]
async fn brief_to_completed_build() {
    let gateway = Arc::new(MockGateway::new());

    let proposal = gateway
        .propose_website("boutique coffee roaster in Lisbon")
        .await
        .unwrap();
    assert!(!proposal.business_name.is_empty());
    assert!(!proposal.pages.is_empty());

    let session = BuildSession::new(gateway.clone());
    assert_eq!(session.status(), BuildStatus::Idle);

    let status = session.start(proposal).await.unwrap();

    assert_eq!(status, BuildStatus::Completed);
    assert!(!session.files().is_empty());
    assert!(!session.preview_document().is_empty());
    assert_eq!(
        gateway.get_method_calls("propose_website")[0].input,
        "boutique coffee roaster in Lisbon"
    );
}

#[tokio::test]
async fn edit_on_disk_then_revise() {
    let gateway = Arc::new(MockGateway::new());
    let session = BuildSession::new(gateway.clone());
    session
        .start(codeset_studio::mock::sample_proposal("Torra"))
        .await
        .unwrap();

    let temp = tempdir().unwrap();
    session.files().write_to_dir(temp.path()).unwrap();
    std::fs::write(temp.path().join("global.css"), "body { color: teal; }").unwrap();

    let on_disk = FileSet::read_from_dir(temp.path()).unwrap();
    assert_eq!(on_disk.by_name("global.css").unwrap().content, "body { color: teal; }");

    let index = session
        .files()
        .names()
        .iter()
        .position(|n| *n == "global.css")
        .unwrap();
    session.edit_file(index, "body { color: teal; }").unwrap();
    session.request_revision("use a serif headline").await.unwrap();

    assert_eq!(session.status(), BuildStatus::Completed);
    let call = &gateway.get_method_calls("revise_files")[0];
    assert_eq!(call.input, "use a serif headline");
    assert_eq!(
        session.files().by_name("global.css").unwrap().content,
        "body { color: teal; }"
    );
}

#[tokio::test]
async fn planner_and_builder_share_active_project() {
    let temp = tempdir().unwrap();
    let store_path = temp.path().join("store.json");

    let proposal = MockGateway::new().propose_website("bakery").await.unwrap();
    ProjectStore::new(Arc::new(JsonFileStore::new(&store_path)))
        .save(&proposal)
        .unwrap();

    let loaded = ProjectStore::new(Arc::new(JsonFileStore::new(&store_path)))
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(loaded, proposal);

    let mut workspace = WorkspaceView::new(BuildSession::new(Arc::new(MockGateway::new())));
    workspace.session().start(loaded).await.unwrap();
    workspace.set_tab(WorkspaceTab::Assets);
    workspace.generate_asset("latte art").await.unwrap();

    let deployed = workspace.deploy(&temp.path().join("site")).unwrap();
    assert!(deployed.exists());
    assert_eq!(workspace.assets().len(), 1);
}
