//! Combat narration
//!
//! Melee blows are described by magnitude; spells and skills may carry
//! their own table in the catalog.

use super::{AttackKind, AuraKind};
use crate::character::{CharId, Position};
use crate::magic::{MessageSet, SpellId};
use crate::world::{Audience, CombatWorld};

/// One magnitude bucket: (room, attacker, victim)
type DamageLine = (&'static str, &'static str, &'static str);

/// Melee lines by magnitude; `#w` is the attack verb, `#W` its third person
pub const DAMAGE_MESSAGES: [DamageLine; 9] = [
    (
        "$n tries to #w $N, but misses.",
        "You try to #w $N, but miss.",
        "$n tries to #w you, but misses.",
    ),
    (
        "$n tickles $N as $e #W $M.",
        "You tickle $N as you #w $M.",
        "$n tickles you as $e #W you.",
    ),
    ("$n barely #W $N.", "You barely #w $N.", "$n barely #W you."),
    ("$n #W $N.", "You #w $N.", "$n #W you."),
    ("$n #W $N hard.", "You #w $N hard.", "$n #W you hard."),
    ("$n #W $N very hard.", "You #w $N very hard.", "$n #W you very hard."),
    (
        "$n #W $N extremely hard.",
        "You #w $N extremely hard.",
        "$n #W you extremely hard.",
    ),
    (
        "$n massacres $N to small fragments with $s #w.",
        "You massacre $N to small fragments with your #w.",
        "$n massacres you to small fragments with $s #w.",
    ),
    (
        "$n OBLITERATES $N with $s deadly #w!!",
        "You OBLITERATE $N with your deadly #w!!",
        "$n OBLITERATES you with $s deadly #w!!",
    ),
];

/// Index into [`DAMAGE_MESSAGES`] for a damage amount
pub const fn damage_bucket(dam: i32) -> usize {
    match dam {
        i32::MIN..=0 => 0,
        1..=2 => 1,
        3..=4 => 2,
        5..=6 => 3,
        7..=10 => 4,
        11..=14 => 5,
        15..=19 => 6,
        20..=23 => 7,
        _ => 8,
    }
}

/// Substitute the attack verbs into a template
pub fn replace_weapon_words(template: &str, singular: &str, plural: &str) -> String {
    template.replace("#w", singular).replace("#W", plural)
}

impl CombatWorld {
    /// Describe a melee blow by its magnitude
    pub(crate) fn dam_message(&mut self, dam: i32, ch: CharId, victim: CharId, kind: AttackKind) {
        let (room, attacker, target) = DAMAGE_MESSAGES[damage_bucket(dam)];
        let weapon = self.char(ch).and_then(|c| c.wielded());
        let words = |t: &str| replace_weapon_words(t, kind.singular(), kind.plural());

        self.act(&words(room), ch, weapon, Some(victim), Audience::RoomButVictim);
        self.act(&words(attacker), ch, weapon, Some(victim), Audience::Actor);
        self.act(&words(target), ch, weapon, Some(victim), Audience::Victim);
    }

    /// Describe spell or skill damage from its catalog table
    ///
    /// Returns `false` when the entry has no table.
    pub(crate) fn skill_message(&mut self, dam: i32, ch: CharId, victim: CharId, spell: SpellId) -> bool {
        let Some(table) = self.catalog.get(spell).and_then(|d| d.combat.clone()) else {
            return false;
        };
        let Some(v) = self.char(victim) else {
            return false;
        };
        let set: &MessageSet = if v.is_immortal() {
            &table.god
        } else if dam == 0 {
            &table.miss
        } else if v.position == Position::Dead {
            &table.die
        } else {
            &table.hit
        };

        let weapon = self.char(ch).and_then(|c| c.wielded());
        self.act(&set.attacker, ch, weapon, Some(victim), Audience::Actor);
        self.act(&set.victim, ch, weapon, Some(victim), Audience::Victim);
        self.act(&set.room, ch, weapon, Some(victim), Audience::RoomButVictim);
        true
    }

    /// Describe counter-damage from an aura; `ch` carries the aura
    pub(crate) fn aura_message(&mut self, ch: CharId, victim: CharId, aura: AuraKind) {
        let noun = aura.noun();
        self.act(&format!("Your {noun} lash out at $N!"), ch, None, Some(victim), Audience::Actor);
        self.act(&format!("You are struck by $n's {noun}!"), ch, None, Some(victim), Audience::Victim);
        self.act(
            &format!("$N is struck by $n's {noun}!"),
            ch,
            None,
            Some(victim),
            Audience::RoomButVictim,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Character, Class};
    use crate::magic::{CombatMessages, SpellCatalog, SpellDef};
    use crate::world::{MessageLog, Room, RoomId};

    #[test]
    fn test_buckets() {
        assert_eq!(damage_bucket(0), 0);
        assert_eq!(damage_bucket(2), 1);
        assert_eq!(damage_bucket(4), 2);
        assert_eq!(damage_bucket(6), 3);
        assert_eq!(damage_bucket(10), 4);
        assert_eq!(damage_bucket(14), 5);
        assert_eq!(damage_bucket(19), 6);
        assert_eq!(damage_bucket(23), 7);
        assert_eq!(damage_bucket(24), 8);
        assert_eq!(damage_bucket(500), 8);
    }

    #[test]
    fn test_replace_weapon_words() {
        assert_eq!(
            replace_weapon_words("$n #W $N as you #w.", "slash", "slashes"),
            "$n slashes $N as you slash."
        );
    }

    #[test]
    fn test_audiences_get_their_lines() {
        let log = MessageLog::new();
        let mut w = CombatWorld::new(1);
        w.set_messenger(Box::new(log.clone()));
        w.rooms.insert(Room::new(RoomId(1), "Pit"));
        let a = w.spawn(Character::player(CharId(0), "Alys", Class::Warrior, 10), RoomId(1));
        let b = w.spawn(Character::npc(CharId(0), "orc", "an orc", 5), RoomId(1));
        let c = w.spawn(Character::player(CharId(0), "Bryn", Class::Cleric, 3), RoomId(1));

        w.dam_message(12, a, b, AttackKind::Slash);
        assert_eq!(log.lines_for(a), vec!["You slash an orc very hard."]);
        assert_eq!(log.lines_for(b), vec!["Alys slashes you very hard."]);
        assert_eq!(log.lines_for(c), vec!["Alys slashes an orc very hard."]);
    }

    #[test]
    fn test_skill_message_prefers_catalog() {
        let mut kick = SpellDef::new(SpellId(9), "kick");
        let mut table = CombatMessages::default();
        table.hit.attacker = "Your kick lands on $N.".into();
        table.miss.attacker = "You kick at $N and miss.".into();
        kick.combat = Some(table);

        let log = MessageLog::new();
        let catalog = SpellCatalog::from_defs(vec![kick]).unwrap();
        let mut w = CombatWorld::with_parts(Default::default(), catalog, 1);
        w.set_messenger(Box::new(log.clone()));
        w.rooms.insert(Room::new(RoomId(1), "Pit"));
        let a = w.spawn(Character::player(CharId(0), "Alys", Class::Warrior, 10), RoomId(1));
        let b = w.spawn(Character::npc(CharId(0), "orc", "an orc", 5), RoomId(1));

        assert!(w.skill_message(4, a, b, SpellId(9)));
        assert!(w.skill_message(0, a, b, SpellId(9)));
        assert!(!w.skill_message(4, a, b, SpellId(10)));
        assert_eq!(
            log.lines_for(a),
            vec!["Your kick lands on an orc.", "You kick at an orc and miss."]
        );
    }
}
