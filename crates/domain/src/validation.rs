//! Static checks over world data.
//!
//! Runtime lookups treat a broken exit graph as a defined miss. The linter
//! surfaces the same defects up front so they can be fixed in the data.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::location::Location;
use crate::world::WorldData;

/// One defect found in world data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LintFinding {
    /// Exit whose target names no map
    DanglingExit { map: Location, exit_id: i32, target: Location },
    /// Several exits of one map share a target; only the first is reachable
    AmbiguousExit { map: Location, target: Location, exit_ids: Vec<i32> },
    EmptyExitBounds { map: Location, exit_id: i32 },
    DuplicateId { scope: String, entity: &'static str, id: i32 },
    /// Room link pointing at a room missing from the interior map
    BadRoomLink { room: Location, linked_room: i32 },
    BadSpawn { reason: String },
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingExit { map, exit_id, target } => {
                write!(f, "{map}: exit {exit_id} targets unknown {target}")
            }
            Self::AmbiguousExit { map, target, exit_ids } => {
                write!(f, "{map}: exits {exit_ids:?} all target {target}")
            }
            Self::EmptyExitBounds { map, exit_id } => {
                write!(f, "{map}: exit {exit_id} has empty bounds")
            }
            Self::DuplicateId { scope, entity, id } => {
                write!(f, "{scope}: duplicate {entity} id {id}")
            }
            Self::BadRoomLink { room, linked_room } => {
                write!(f, "{room}: link to missing room {linked_room}")
            }
            Self::BadSpawn { reason } => write!(f, "spawn: {reason}"),
        }
    }
}

fn duplicates<I>(ids: I) -> Vec<i32>
where
    I: IntoIterator<Item = i32>,
{
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for id in ids {
        if !seen.insert(id) && !dups.contains(&id) {
            dups.push(id);
        }
    }
    dups
}

/// Run every check over `world`. An empty result means the data is clean.
pub fn lint_world(world: &WorldData) -> Vec<LintFinding> {
    let mut findings = Vec::new();

    let mut push_dups = |scope: String, entity: &'static str, dups: Vec<i32>| {
        for id in dups {
            findings.push(LintFinding::DuplicateId {
                scope: scope.clone(),
                entity,
                id,
            });
        }
    };

    push_dups("world data".into(), "world", duplicates(world.worlds.iter().map(|w| w.id)));
    for w in &world.worlds {
        let scope = Location::world(w.id).to_string();
        push_dups(scope.clone(), "town", duplicates(w.towns.iter().map(|t| t.id)));
        push_dups(scope, "tile map", duplicates(w.tile_maps.iter().map(|tm| tm.id)));
        for town in &w.towns {
            let scope = Location::town(w.id, town.id).to_string();
            push_dups(scope, "building", duplicates(town.buildings.iter().map(|b| b.id)));
            for building in &town.buildings {
                let scope = Location::building(w.id, town.id, building.id).to_string();
                push_dups(
                    scope.clone(),
                    "interior map",
                    duplicates(building.interior_maps.iter().map(|m| m.id)),
                );
                for interior in &building.interior_maps {
                    push_dups(
                        format!("{scope}, i{}", interior.id),
                        "room",
                        duplicates(interior.rooms.iter().map(|r| r.id)),
                    );
                }
            }
        }
    }

    for map in world.maps() {
        let exits = map.exits();

        let mut targets: Vec<Location> = Vec::new();
        for exit in exits {
            if exit.bounds.is_empty() {
                findings.push(LintFinding::EmptyExitBounds {
                    map: map.location,
                    exit_id: exit.id,
                });
            }
            if world.resolve(&exit.target).is_none() {
                findings.push(LintFinding::DanglingExit {
                    map: map.location,
                    exit_id: exit.id,
                    target: exit.target,
                });
            }
            if !targets.contains(&exit.target) {
                targets.push(exit.target);
            }
        }
        for target in targets {
            let exit_ids: Vec<i32> = exits
                .iter()
                .filter(|e| e.target == target)
                .map(|e| e.id)
                .collect();
            if exit_ids.len() > 1 {
                findings.push(LintFinding::AmbiguousExit {
                    map: map.location,
                    target,
                    exit_ids,
                });
            }
        }

        for near in map.near_scopes() {
            if world.room(&near).is_none() {
                findings.push(LintFinding::BadRoomLink {
                    room: map.location,
                    linked_room: near.room_id,
                });
            }
        }
    }

    if let Err(e) = world.spawn_point() {
        findings.push(LintFinding::BadSpawn {
            reason: e.to_string(),
        });
    }

    findings
}
