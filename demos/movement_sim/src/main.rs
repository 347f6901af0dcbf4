//! Movement simulation — drives the reflex core end to end.
//!
//! Spawns a handful of movers, queries them through an incrementally
//! maintained group, integrates positions for a few ticks, then exercises
//! the lifecycle edges: freezing an entity out of the group, destroying an
//! entity while an external collector still retains it, and the final
//! destroy-all leak check.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use components::{kinds, BoardConfig, Frozen, Health, Position, Velocity};
use reflex_core::{Context, EntityId, GroupChange, Matcher, OwnerToken};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("movement_sim=info".parse()?))
        .init();

    let mut ctx = Context::new(components::context_info());

    // One entity carries the board-wide settings.
    ctx.add_unique(kinds::BOARD_CONFIG, BoardConfig::default(), false)?;

    // The movers group is maintained incrementally from here on.
    let movers = ctx.get_group(
        Matcher::all_of([kinds::POSITION, kinds::VELOCITY]).none_of([kinds::FROZEN]),
    );
    ctx.on_group_changed(movers, |_, event| match event.change {
        GroupChange::Added => info!(entity = %event.entity, "joined movers"),
        GroupChange::Removed => info!(entity = %event.entity, "left movers"),
        GroupChange::Updated => {}
    });

    for i in 0..4 {
        let entity = ctx.create_entity_named(&format!("mover-{i}"))?;
        ctx.add_component(entity, kinds::POSITION, Position::new(i as f32, 0.0, 0.0))?;
        ctx.add_component(entity, kinds::VELOCITY, Velocity::new(1.0, 0.0, 0.0))?;
        ctx.add_component(entity, kinds::HEALTH, Health::full(100.0))?;
    }
    let obstacle = ctx.create_entity_named("obstacle")?;
    ctx.add_component(obstacle, kinds::POSITION, Position::new(9.0, 0.0, 0.0))?;
    ctx.add_component(obstacle, kinds::FROZEN, Frozen)?;

    let config = *ctx
        .unique::<BoardConfig>(kinds::BOARD_CONFIG)
        .expect("board config was added above");
    let dt = (1.0 / config.tick_rate) as f32;

    for tick in 0..3u64 {
        let members: Vec<_> = ctx.group(movers).iter().collect();
        for entity in members {
            let position = *ctx.component::<Position>(entity, kinds::POSITION)?;
            let velocity = *ctx.component::<Velocity>(entity, kinds::VELOCITY)?;
            let next = Position {
                point: position.point + velocity.linear * dt,
            };
            ctx.replace_component(entity, kinds::POSITION, next)?;
        }
        info!(tick, movers = ctx.group(movers).len(), "tick complete");
    }

    // Freezing a mover drops it out of the group without destroying it.
    let frozen_mover = ctx.get_entity(EntityId(2)).expect("mover-0 is live");
    ctx.add_component(frozen_mover, kinds::FROZEN, Frozen)?;

    // A collector retains an entity past its destruction; the context defers
    // reclamation until the collector releases.
    let collector = OwnerToken::new();
    let doomed = ctx.get_entity(EntityId(3)).expect("mover-1 is live");
    ctx.retain(doomed, collector)?;
    ctx.destroy_entity(doomed)?;
    info!(
        retained = ctx.retained_count(),
        reusable = ctx.reusable_count(),
        "destroyed a retained entity"
    );
    ctx.release(doomed, collector)?;
    info!(
        retained = ctx.retained_count(),
        reusable = ctx.reusable_count(),
        "collector released"
    );

    ctx.destroy_all_entities()?;
    info!(context = %ctx, "simulation finished");
    Ok(())
}
