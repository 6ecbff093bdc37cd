//! Loading generation configs from JSON files.

use std::io::Write;
use tempfile::NamedTempFile;
use undercroft::{generate_dungeon, GenerationConfig, UndercroftError, UndercroftResult};

fn write_config(json: &str) -> UndercroftResult<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(json.as_bytes())?;
    Ok(file)
}

#[test]
fn test_round_trip_through_file() -> UndercroftResult<()> {
    let mut config = GenerationConfig::for_detailed_generation(99);
    config.decoration_prefabs = vec!["bones".to_string()];
    let file = write_config(&config.to_json_string()?)?;

    let loaded = GenerationConfig::load_from_file(file.path())?;
    assert_eq!(loaded, config);
    Ok(())
}

#[test]
fn test_partial_config_uses_defaults() -> UndercroftResult<()> {
    let file = write_config(r#"{ "seed": 7, "enable_special_room": false }"#)?;
    let loaded = GenerationConfig::load_from_file(file.path())?;

    let defaults = GenerationConfig::default();
    assert_eq!(loaded.seed, 7);
    assert!(!loaded.enable_special_room);
    assert_eq!(loaded.dungeon_width, defaults.dungeon_width);
    assert_eq!(loaded.waypoint_retry_limit, 10);
    assert_eq!(loaded.feature_placement_attempts, 100);

    let dungeon = generate_dungeon(&loaded)?;
    assert!(dungeon.special_room().is_none());
    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() -> UndercroftResult<()> {
    for json in [
        r#"{ "cell_width": 4 }"#,
        r#"{ "room_chance_percent": 101 }"#,
        r#"{ "corridor_min_width": 3, "corridor_max_width": 2 }"#,
        r#"{ "corridor_max_width": 9 }"#,
        r#"{ "corridor_winding_factor": 1.5 }"#,
        r#"{ "dungeon_width": 8 }"#,
    ] {
        let file = write_config(json)?;
        assert!(
            matches!(
                GenerationConfig::load_from_file(file.path()),
                Err(UndercroftError::InvalidConfig(_))
            ),
            "{json} was accepted"
        );
    }
    Ok(())
}

#[test]
fn test_oversized_grids_are_rejected() -> UndercroftResult<()> {
    for json in [
        r#"{ "dungeon_width": 50000, "dungeon_height": 50000 }"#,
        r#"{ "dungeon_width": 2147483647, "dungeon_height": 2 }"#,
        r#"{ "buffer_x": 2000000000 }"#,
    ] {
        let file = write_config(json)?;
        assert!(
            matches!(
                GenerationConfig::load_from_file(file.path()),
                Err(UndercroftError::InvalidConfig(_))
            ),
            "{json} was accepted"
        );
    }

    let mut config = GenerationConfig::new(1);
    config.dungeon_width = 50_000;
    config.dungeon_height = 50_000;
    assert!(matches!(
        generate_dungeon(&config),
        Err(UndercroftError::InvalidConfig(_))
    ));
    Ok(())
}

#[test]
fn test_malformed_json_is_a_serde_error() -> UndercroftResult<()> {
    let file = write_config("{ seed: ")?;
    assert!(matches!(
        GenerationConfig::load_from_file(file.path()),
        Err(UndercroftError::Serde(_))
    ));
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.json");
    assert!(matches!(
        GenerationConfig::load_from_file(missing),
        Err(UndercroftError::Io(_))
    ));
}
