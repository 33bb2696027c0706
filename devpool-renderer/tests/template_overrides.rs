use devpool_core::{IssueId, IssueState, RepoRef, SourceIssue};
use devpool_renderer::{IssueContext, Renderer, TemplateEngine, TemplateKind};
use tempfile::TempDir;

fn source() -> SourceIssue {
    SourceIssue {
        id: IssueId::from("I_kwDOabc"),
        number: 12,
        title: "Add retries to uploader".to_string(),
        body: Some("details".to_string()),
        state: IssueState::Open,
        labels: vec!["Price: 200 USD".to_string(), "Time: <1 Day".to_string()],
        html_url: "https://github.com/acme/uploader/issues/12".to_string(),
        repo: RepoRef::new("acme", "uploader"),
        assignee: None,
    }
}

#[test]
fn user_template_overrides_embedded_body() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("mirror_body.md.tera"),
        "Mirrored from {{ partner }}: {{ link }}\r\n",
    )
    .expect("write override");

    let renderer = Renderer::with_overrides(Some(dir.path())).expect("renderer");
    let ctx = IssueContext::from_source(&source(), "https://www.github.com/acme/uploader/issues/12");
    let body = renderer.render_mirror_body(&ctx).expect("render");
    assert_eq!(
        body,
        "Mirrored from acme/uploader: https://www.github.com/acme/uploader/issues/12"
    );
}

#[test]
fn override_dir_keeps_defaults_for_untouched_templates() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("mirror_body.md.tera"), "custom {{ link }}").expect("write");
    std::fs::write(dir.path().join("notes.txt"), "ignored, not a template").expect("write");

    let renderer = Renderer::with_overrides(Some(dir.path())).expect("renderer");
    let ctx = IssueContext::from_source(&source(), "L")
        .with_mirror_url("https://github.com/acme/devpool/issues/3");
    let text = renderer.render_announcement(&ctx).expect("render");
    assert!(text.starts_with("200 USD | Add retries to uploader"), "got: {text}");
    assert!(text.ends_with("https://github.com/acme/devpool/issues/3"));
}

#[test]
fn missing_override_dir_falls_back_to_embedded() {
    let dir = TempDir::new().expect("tempdir");
    let absent = dir.path().join("does-not-exist");
    let engine = TemplateEngine::new(Some(&absent)).expect("engine");
    let ctx = IssueContext::from_source(&source(), "L");
    assert_eq!(engine.render(&ctx, TemplateKind::MirrorBody).expect("render"), "L");
}

#[test]
fn broken_override_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("mirror_body.md.tera"), "{{ link ").expect("write");
    assert!(Renderer::with_overrides(Some(dir.path())).is_err());
}
