//! Boss room lock state machine driven through the public `Dungeon` API.

use std::cell::Cell;
use undercroft::generation::boss::barrier_ring;
use undercroft::{
    generate_dungeon, BossTransition, GenerationConfig, TileKind, UndercroftError,
    UndercroftResult,
};

#[test]
fn test_initial_lock_raises_barriers() -> UndercroftResult<()> {
    let dungeon = generate_dungeon(&GenerationConfig::for_testing(40))?;
    let boss = dungeon.boss_room().expect("boss room exists");

    assert!(dungeon.is_boss_room_locked());
    assert_eq!(dungeon.barriers(), barrier_ring(&boss.bounds, 2).as_slice());
    assert!(dungeon.barriers().iter().all(|&pos| !boss.bounds.contains(pos)));
    Ok(())
}

#[test]
fn test_polling_until_solved() -> UndercroftResult<()> {
    let mut dungeon = generate_dungeon(&GenerationConfig::for_testing(41))?;
    let solved = Cell::new(false);
    let status = || solved.get();

    for _ in 0..3 {
        assert_eq!(dungeon.update_boss_lock(&status)?, None);
        assert!(dungeon.is_boss_room_locked());
    }

    solved.set(true);
    let transition = dungeon.update_boss_lock(&status)?;
    assert!(matches!(
        transition,
        Some(BossTransition::Unlocked {
            connected_to: Some(_),
            ..
        })
    ));
    assert!(!dungeon.is_boss_room_locked());
    assert!(dungeon.barriers().is_empty());

    // Already unlocked: polling again changes nothing.
    let grid = dungeon.grid().clone();
    assert_eq!(dungeon.update_boss_lock(&status)?, None);
    assert_eq!(dungeon.grid(), &grid);
    Ok(())
}

#[test]
fn test_unlock_carves_non_essential_corridor() -> UndercroftResult<()> {
    let mut dungeon = generate_dungeon(&GenerationConfig::for_testing(42))?;
    let boss_floor = dungeon.grid().count(TileKind::BossFloor);
    let before = dungeon.grid().count(TileKind::NonEssentialFloor);

    let Some(BossTransition::Unlocked { corridor_tiles, .. }) = dungeon.unlock_boss_room()? else {
        panic!("boss room should unlock");
    };
    assert!(corridor_tiles > 0);
    assert_eq!(
        dungeon.grid().count(TileKind::NonEssentialFloor),
        before + corridor_tiles
    );
    assert_eq!(dungeon.grid().count(TileKind::BossFloor), boss_floor);
    dungeon.validate()
}

#[test]
fn test_relock_restores_barriers_and_keeps_corridor() -> UndercroftResult<()> {
    let mut dungeon = generate_dungeon(&GenerationConfig::for_testing(43))?;
    let barriers = dungeon.barriers().to_vec();

    dungeon.unlock_boss_room()?;
    let unlocked_grid = dungeon.grid().clone();

    assert_eq!(dungeon.lock_boss_room()?, Some(BossTransition::Locked));
    assert!(dungeon.is_boss_room_locked());
    assert_eq!(dungeon.barriers(), barriers.as_slice());
    assert_eq!(dungeon.grid(), &unlocked_grid);
    assert_eq!(dungeon.lock_boss_room()?, None);
    Ok(())
}

#[test]
fn test_lock_disabled_starts_unlocked() -> UndercroftResult<()> {
    let mut config = GenerationConfig::for_testing(44);
    config.enable_puzzle_boss_room_lock = false;
    let mut dungeon = generate_dungeon(&config)?;

    assert!(!dungeon.is_boss_room_locked());
    assert_eq!(dungeon.update_boss_lock(&true)?, None);
    assert_eq!(dungeon.unlock_boss_room()?, None);
    Ok(())
}

#[test]
fn test_transitions_without_boss_room() -> UndercroftResult<()> {
    let mut config = GenerationConfig::for_testing(45);
    config.enable_boss_room = false;
    let mut dungeon = generate_dungeon(&config)?;

    assert!(!dungeon.is_boss_room_locked());
    assert_eq!(dungeon.update_boss_lock(&true)?, None);
    assert!(matches!(
        dungeon.unlock_boss_room(),
        Err(UndercroftError::InvalidState(_))
    ));
    assert!(matches!(
        dungeon.lock_boss_room(),
        Err(UndercroftError::InvalidState(_))
    ));
    Ok(())
}
