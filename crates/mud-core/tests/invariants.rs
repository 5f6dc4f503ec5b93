//! Property tests for the engine's standing invariants

use mud_core::character::{Affect, AffectFlags, ApplyLocation, CharId, Character, Class, Position};
use mud_core::combat::{AttackKind, DamageCause, DamageResult};
use mud_core::magic::{ClassAssignment, Formula, SpellCatalog, SpellDef, SpellId, Voice};
use mud_core::world::{CombatWorld, Room, RoomId};
use mud_core::HP_DEAD;
use proptest::prelude::*;

const ROOM: RoomId = RoomId(1);

fn crowd(n: usize) -> (CombatWorld, Vec<CharId>) {
    let mut w = CombatWorld::new(77);
    w.rooms.insert(Room::new(ROOM, "Market"));
    let ids = (0..n)
        .map(|i| {
            let ch = if i % 2 == 0 {
                Character::player(CharId(0), &format!("P{i}"), Class::Warrior, 10)
            } else {
                Character::npc(CharId(0), "bandit", "a bandit", 10)
            };
            w.spawn(ch.with_hit(50, 50), ROOM)
        })
        .collect();
    (w, ids)
}

#[derive(Debug, Clone)]
enum Op {
    Engage(usize, usize),
    Disengage(usize),
    Extract(usize),
    Round,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..6, 0usize..6).prop_map(|(a, b)| Op::Engage(a, b)),
        2 => (0usize..6).prop_map(Op::Disengage),
        1 => (0usize..6).prop_map(Op::Extract),
        1 => Just(Op::Round),
    ]
}

fn location() -> impl Strategy<Value = ApplyLocation> {
    prop::sample::select(vec![
        ApplyLocation::Str,
        ApplyLocation::Dex,
        ApplyLocation::Con,
        ApplyLocation::MaxHit,
        ApplyLocation::MaxMana,
        ApplyLocation::Armor,
        ApplyLocation::Hitroll,
        ApplyLocation::Damroll,
        ApplyLocation::SaveSpell,
    ])
}

proptest! {
    #[test]
    fn prop_combat_list_matches_fighting(ops in prop::collection::vec(op(), 1..40)) {
        let (mut w, ids) = crowd(6);
        for op in ops {
            match op {
                Op::Engage(a, b) => {
                    if w.char(ids[a]).is_some_and(|c| c.fighting().is_none()) {
                        w.set_fighting(ids[a], ids[b]);
                    }
                }
                Op::Disengage(a) => w.stop_fighting(ids[a]),
                Op::Extract(a) => w.extract_char(ids[a]),
                Op::Round => w.perform_violence(),
            }

            let list = w.combat_list().to_vec();
            let mut dedup = list.clone();
            dedup.sort();
            dedup.dedup();
            prop_assert_eq!(dedup.len(), list.len());

            for c in w.characters() {
                prop_assert_eq!(list.contains(&c.id), c.fighting().is_some(), "{}", c.id);
                if let Some(target) = c.fighting() {
                    prop_assert!(w.char(target).is_some());
                    prop_assert_ne!(target, c.id);
                }
            }
        }
    }

    #[test]
    fn prop_position_follows_hit_points(hits in prop::collection::vec(0i32..40, 1..12)) {
        let (mut w, ids) = crowd(2);
        let (attacker, victim) = (ids[0], ids[1]);
        for dam in hits {
            let result = w.damage(attacker, victim, dam, DamageCause::Weapon(AttackKind::Slash));
            let Some(v) = w.char(victim) else {
                prop_assert_eq!(result, DamageResult::Killed);
                break;
            };
            prop_assert!(v.hit() > HP_DEAD);
            let expected = Position::derive(v.hit(), Position::Standing);
            if v.hit() > 0 {
                prop_assert!(v.position > Position::Stunned);
            } else {
                prop_assert_eq!(v.position, expected);
            }
        }
    }

    #[test]
    fn prop_affect_round_trip(loc in location(), modifier in -50i32..50, duration in -1i32..24) {
        let mut ch = Character::player(CharId(1), "Tess", Class::Cleric, 12).with_hit(40, 80);
        let before = ch.clone();
        ch.add_affect(
            Affect::new(SpellId(9), loc, modifier, duration).with_flags(AffectFlags::DETECT_MAGIC),
        );
        prop_assert!(ch.is_affected(AffectFlags::DETECT_MAGIC));
        prop_assert_eq!(ch.remove_affects_from(SpellId(9)), 1);
        prop_assert_eq!(ch, before);
    }

    #[test]
    fn prop_mana_cost_at_least_one(
        base in -500i64..500,
        cross_class in any::<bool>(),
        density in 0.0f32..1.0,
        voice in prop::sample::select(vec![Voice::Normal, Voice::Diminish, Voice::Amplify]),
    ) {
        let mut def = SpellDef::new(SpellId(1), "flare");
        def.classes.push(ClassAssignment {
            class: if cross_class { Class::Cleric } else { Class::MagicUser },
            level: 1,
            mana: Formula::constant(base),
        });
        let catalog = SpellCatalog::from_defs(vec![def]).unwrap();
        let mut w = CombatWorld::with_parts(Default::default(), catalog, 3);
        let mut room = Room::new(ROOM, "Tower");
        room.magic_density = density;
        w.rooms.insert(room);
        let m = w.spawn(Character::player(CharId(0), "Mira", Class::MagicUser, 30), ROOM);
        prop_assert!(w.mana_cost(m, None, SpellId(1), voice) >= 1);
    }
}
