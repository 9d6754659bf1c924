//! Ability identifier compilation and matching.
//!
//! A check compiles the requested ability and target into every identifier
//! a grant could have been stored under, then scans an authority's abilities
//! for the first one carrying any of them.

use crate::types::{Ability, AbilityId, Target};

/// Compile the identifiers that would grant `ability` on `target`, most
/// specific first. Everything is lower-cased.
///
/// - no target: `[ability, "*-*", "*"]`
/// - wildcard: `["{ability}-*", "*-*"]`
/// - type `T`: `["{ability}-T", "{ability}-*", "*-T", "*-*"]`, followed by
///   `"{ability}-T-K"` and `"*-T-K"` when the target is an existing row `K`
pub fn compile(ability: &str, target: Option<&Target>) -> Vec<String> {
    let identifiers = match target {
        None => vec![ability.to_string(), "*-*".to_string(), "*".to_string()],
        Some(Target::Wildcard) => vec![format!("{ability}-*"), "*-*".to_string()],
        Some(Target::Class(entity_type)) => type_identifiers(ability, entity_type),
        Some(Target::Entity(entity)) => {
            let mut identifiers = type_identifiers(ability, &entity.entity_type);
            if entity.exists {
                identifiers.push(format!("{ability}-{}-{}", entity.entity_type, entity.id));
                identifiers.push(format!("*-{}-{}", entity.entity_type, entity.id));
            }
            identifiers
        }
    };

    identifiers.into_iter().map(|i| i.to_lowercase()).collect()
}

fn type_identifiers(ability: &str, entity_type: &str) -> Vec<String> {
    vec![
        format!("{ability}-{entity_type}"),
        format!("{ability}-*"),
        format!("*-{entity_type}"),
        "*-*".to_string(),
    ]
}

/// The owned-scoped variant of each candidate.
pub fn owned(candidates: &[String]) -> Vec<String> {
    candidates.iter().map(|c| format!("{c}-owned")).collect()
}

/// Pair each ability's id with its identifier, keeping the given order.
pub fn ability_map(abilities: &[Ability]) -> Vec<(AbilityId, String)> {
    abilities.iter().map(|a| (a.id, a.identifier())).collect()
}

/// The id of the first ability, in map order, whose identifier is one of
/// the candidates.
///
/// All candidates weigh the same here; ties between abilities are settled
/// by the order of `ability_map`.
pub fn matched_ability_id(
    ability_map: &[(AbilityId, String)],
    candidates: &[String],
) -> Option<AbilityId> {
    ability_map
        .iter()
        .find(|(_, identifier)| candidates.contains(identifier))
        .map(|(id, _)| *id)
}
