use std::env;

pub fn insta_snapshot<F: FnOnce()>(f: F) {
    let mut settings = insta::Settings::clone_current();
    let snapshot_path = env::current_dir().unwrap().join("./test/snapshots");
    settings.set_snapshot_path(snapshot_path);
    settings.bind(f);
}

pub fn history_fixture() -> &'static str {
    return r#"[
    {
        "id": "m1",
        "sender": "system",
        "content": "Welcome to Souk support. An agent will be with you shortly.",
        "createdAt": "2024-01-10T10:00:00Z"
    },
    {
        "id": "m2",
        "sender": "support-agent-2",
        "content": "Hi! How can we help today?",
        "createdAt": "2024-01-10T10:00:05Z"
    }
]"#;
}
