//! Structural invariant checks for a restored [`World`].
//!
//! A snapshot that deserializes cleanly can still describe an impossible
//! tree (a city whose owner is missing, a counter behind an issued id).
//! [`World::validate`] walks the whole tree and reports every violation so
//! a corrupt file fails startup with a complete diagnosis.

use std::collections::BTreeSet;

use stronghold_types::{CityId, TroopKind, UserId};

use crate::world::World;

/// A single invariant violation found by [`World::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// A user is stored under a key that differs from its username.
    #[error("user stored under key {key:?} has username {username:?}")]
    UserKeyMismatch {
        /// Map key.
        key: String,
        /// Username inside the record.
        username: String,
    },

    /// Two users share one identifier.
    #[error("user id {0} is used more than once")]
    DuplicateUserId(UserId),

    /// A user id is not below the user counter.
    #[error("user id {id} is not below next_user_id {next}")]
    UserIdAheadOfCounter {
        /// Offending id.
        id: UserId,
        /// Counter value.
        next: UserId,
    },

    /// A city is stored under a key that differs from its id.
    #[error("city stored under key {key} has id {id}")]
    CityKeyMismatch {
        /// Map key.
        key: CityId,
        /// Id inside the record.
        id: CityId,
    },

    /// A city id is not below the city counter.
    #[error("city id {id} is not below next_city_id {next}")]
    CityIdAheadOfCounter {
        /// Offending id.
        id: CityId,
        /// Counter value.
        next: CityId,
    },

    /// A city's owner does not exist.
    #[error("city {city} is owned by missing user {owner}")]
    MissingOwner {
        /// The city.
        city: CityId,
        /// The unresolved owner.
        owner: UserId,
    },

    /// A user lists a city that does not exist.
    #[error("user {user} lists missing city {city}")]
    MissingCity {
        /// The user.
        user: UserId,
        /// The unresolved city.
        city: CityId,
    },

    /// A user lists a city owned by someone else.
    #[error("user {user} lists city {city} owned by {owner}")]
    ForeignCity {
        /// The user.
        user: UserId,
        /// The city.
        city: CityId,
        /// The city's actual owner.
        owner: UserId,
    },

    /// A city holds an empty troop stack.
    #[error("city {city} has an empty {kind} stack")]
    EmptyTroopStack {
        /// The city.
        city: CityId,
        /// Troop kind.
        kind: TroopKind,
    },

    /// A city holds two stacks of the same troop kind.
    #[error("city {city} has more than one {kind} stack")]
    DuplicateTroopStack {
        /// The city.
        city: CityId,
        /// Troop kind.
        kind: TroopKind,
    },
}

impl World {
    /// Check the structural invariants of the tree, returning every
    /// violation found. An empty list means the world is consistent.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut user_ids = BTreeSet::new();

        for (key, user) in &self.users {
            if *key != user.username {
                violations.push(Violation::UserKeyMismatch {
                    key: key.clone(),
                    username: user.username.clone(),
                });
            }
            if !user_ids.insert(user.id) {
                violations.push(Violation::DuplicateUserId(user.id));
            }
            if user.id >= self.next_user_id {
                violations.push(Violation::UserIdAheadOfCounter {
                    id: user.id,
                    next: self.next_user_id,
                });
            }
            for city_id in &user.cities {
                match self.cities.get(city_id) {
                    None => violations.push(Violation::MissingCity {
                        user: user.id,
                        city: *city_id,
                    }),
                    Some(city) if city.owner_id != user.id => {
                        violations.push(Violation::ForeignCity {
                            user: user.id,
                            city: *city_id,
                            owner: city.owner_id,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for (key, city) in &self.cities {
            if *key != city.id {
                violations.push(Violation::CityKeyMismatch {
                    key: *key,
                    id: city.id,
                });
            }
            if city.id >= self.next_city_id {
                violations.push(Violation::CityIdAheadOfCounter {
                    id: city.id,
                    next: self.next_city_id,
                });
            }
            if !user_ids.contains(&city.owner_id) {
                violations.push(Violation::MissingOwner {
                    city: city.id,
                    owner: city.owner_id,
                });
            }
            let mut kinds = BTreeSet::new();
            for stack in &city.troops {
                if stack.quantity == 0 {
                    violations.push(Violation::EmptyTroopStack {
                        city: city.id,
                        kind: stack.kind,
                    });
                }
                if !kinds.insert(stack.kind) {
                    violations.push(Violation::DuplicateTroopStack {
                        city: city.id,
                        kind: stack.kind,
                    });
                }
            }
        }

        violations
    }
}
