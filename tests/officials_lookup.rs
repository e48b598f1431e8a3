//! Config-driven official lookup from a deep-linked URL.

use civicmap::config::{load_settings_with_options, LoadOptions};
use civicmap::{AppState, InitialState, LookupError};

const OFFICIALS: &str = r#"[
    { "Department": "BBMP (Ward)", "Area": "Ward 88", "Name": "A. Rao", "Phone": "080-1111" },
    { "Department": "BBMP (Ward)", "Area": "WARD 88", "Name": "Duplicate" },
    { "Department": "City Police", "Area": "HAL Airport", "Name": "B. Iyer" }
]"#;

const CONFIG: &str = r#"
officials = "officials.json"

[layers.bbmp_wards]
format = { kind = "template", template = "Ward {}" }
"#;

async fn settings_in(dir: &std::path::Path) -> civicmap::config::Settings {
    tokio::fs::write(dir.join("officials.json"), OFFICIALS)
        .await
        .unwrap();
    let config_path = dir.join("civicmap.toml");
    tokio::fs::write(&config_path, CONFIG).await.unwrap();

    load_settings_with_options(&LoadOptions {
        config_path: Some(config_path),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_lookup_from_deep_link() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path()).await;
    settings.officials_path = Some(dir.path().join("officials.json"));
    let directory = settings.load_officials().await.unwrap();
    assert_eq!(directory.len(), 3);

    let initial =
        InitialState::from_url("https://maps.example.org/?map=bbmp_wards&dist=88&lng=77.6&lat=12.97")
            .unwrap();
    let state = AppState::new(initial);

    let official = state
        .official_details(&directory, &settings.layers)
        .unwrap()
        .expect("official for ward 88");
    assert_eq!(official.detail("Name"), Some("A. Rao"));
    assert_eq!(official.department, "bbmp_wards");
}

#[tokio::test]
async fn test_lookup_follows_selection_changes() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings_in(dir.path()).await;
    settings.officials_path = Some(dir.path().join("officials.json"));
    let directory = settings.load_officials().await.unwrap();

    let state = AppState::new(InitialState::default());
    assert_eq!(state.official_details(&directory, &settings.layers), Ok(None));

    state.select_district("police_city", "hal airport");
    let official = state
        .official_details(&directory, &settings.layers)
        .unwrap()
        .unwrap();
    assert_eq!(official.detail("Name"), Some("B. Iyer"));

    state.clear_district();
    assert_eq!(state.official_details(&directory, &settings.layers), Ok(None));

    state.select_district("water_board", "1");
    assert_eq!(
        state.official_details(&directory, &settings.layers),
        Err(LookupError::UnknownLayer("water_board".to_string()))
    );
}
