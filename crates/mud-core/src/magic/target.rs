//! The `cast` command
//!
//! Parses the spell name and target argument, checks every precondition
//! without touching state, then rolls for concentration and hands a
//! successful cast to [`CombatWorld::call_magic`].

use thiserror::Error;
use tracing::debug;

use super::effects::Cast;
use super::{CastStyle, SpellDef, SpellId, SpellKind, SpellOutcome, TargetFlags, Voice};
use crate::character::{AffectFlags, CharId, Position};
use crate::consts::PULSE_VIOLENCE;
use crate::object::ObjectId;
use crate::world::{Audience, CombatWorld};

/// Why a cast was refused; the message is what the caster is told
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CastError {
    #[error("{0} is not in the world")]
    NotInWorld(CharId),
    #[error("You can't cast spells.")]
    NpcCannotCast,
    #[error("Cast what where?")]
    NoSpellName,
    #[error("Cast what?!?")]
    UnknownSpell,
    #[error("You are unfamiliar with that spell.")]
    NotKnown,
    #[error("This spell has been disabled.")]
    Disabled,
    #[error("{}", position_refusal(.0))]
    Position(Position),
    #[error("Cannot find the target of your spell!")]
    NoTarget,
    #[error("Upon {} should the spell be cast?", target_noun(.0))]
    NeedTarget(bool),
    #[error("You can only cast this spell upon yourself!")]
    SelfOnly,
    #[error("You cannot cast this spell upon yourself!")]
    NotSelf,
    #[error("You shouldn't cast that on yourself -- could be bad for your health!")]
    SelfViolent,
    #[error("You can't cast this spell if you're not in a group!")]
    GroupRequired,
    #[error("You haven't the energy to cast that spell!")]
    NoMana,
}

fn position_refusal(position: &Position) -> &'static str {
    match position {
        Position::Sleeping => "You dream about great magical powers.",
        Position::Resting => "You cannot concentrate while resting.",
        Position::Sitting | Position::Meditating => "You can't do this sitting!",
        Position::Fighting => "Impossible!  You can't concentrate enough!",
        _ => "You can't concentrate enough!",
    }
}

fn target_noun(object: &bool) -> &'static str {
    if *object { "what" } else { "whom" }
}

/// What a cast ended up aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CastTarget {
    #[default]
    None,
    Char(CharId),
    Object(ObjectId),
}

impl CastTarget {
    pub fn char(&self) -> Option<CharId> {
        match self {
            CastTarget::Char(id) => Some(*id),
            _ => None,
        }
    }

    pub fn object(&self) -> Option<ObjectId> {
        match self {
            CastTarget::Object(id) => Some(*id),
            _ => None,
        }
    }
}

impl CombatWorld {
    /// Split `input` into a spell and the rest of the line
    ///
    /// A quoted name is taken as written. Otherwise the longest run of
    /// leading words that names a spell wins.
    fn parse_cast_input(&self, input: &str) -> Result<(SpellId, String), CastError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CastError::NoSpellName);
        }

        if let Some(quote) = input.chars().next().filter(|c| *c == '\'' || *c == '"') {
            let body = &input[1..];
            let (name, rest) = match body.find(quote) {
                Some(end) => (&body[..end], &body[end + 1..]),
                None => (body, ""),
            };
            if name.trim().is_empty() {
                return Err(CastError::NoSpellName);
            }
            let def = self
                .catalog
                .find_by_name(name)
                .map_err(|_| CastError::UnknownSpell)?;
            return Ok((def.id, rest.trim().to_string()));
        }

        let words: Vec<&str> = input.split_whitespace().collect();
        for n in (1..=words.len()).rev() {
            if let Ok(def) = self.catalog.find_by_name(&words[..n].join(" ")) {
                return Ok((def.id, words[n..].join(" ")));
            }
        }
        Err(CastError::UnknownSpell)
    }

    fn find_char_in_room(&self, caster: CharId, name: &str) -> Option<CharId> {
        let c = self.char(caster)?;
        if matches!(name, "self" | "me") {
            return Some(caster);
        }
        let room = c.room?;
        self.chars_in_room(room)
            .into_iter()
            .find(|&id| self.char(id).is_some_and(|t| t.is_named(name) && c.can_see(t)))
    }

    fn find_char_in_world(&self, caster: CharId, name: &str) -> Option<CharId> {
        if let Some(id) = self.find_char_in_room(caster, name) {
            return Some(id);
        }
        let c = self.char(caster)?;
        self.characters()
            .find(|t| t.room.is_some() && t.is_named(name) && c.can_see(t))
            .map(|t| t.id)
    }

    fn find_object(&self, candidates: impl IntoIterator<Item = ObjectId>, name: &str) -> Option<ObjectId> {
        candidates
            .into_iter()
            .find(|&id| self.object(id).is_some_and(|o| o.is_named(name)))
    }

    /// Choose the target of a cast from its argument
    fn resolve_cast_target(
        &self,
        caster: CharId,
        def: &SpellDef,
        arg: &str,
    ) -> Result<CastTarget, CastError> {
        let c = self.char(caster).ok_or(CastError::NotInWorld(caster))?;
        if def.targets(TargetFlags::IGNORE) {
            return Ok(CastTarget::None);
        }
        if def.targets(TargetFlags::GROUP) && !c.is_affected(AffectFlags::GROUP) {
            return Err(CastError::GroupRequired);
        }

        let name = arg.split_whitespace().next().unwrap_or("");
        let target = if !name.is_empty() {
            self.target_by_name(caster, def, name).ok_or(CastError::NoTarget)?
        } else if let Some(target) = self.default_target(caster, def) {
            target
        } else if def.targets(TargetFlags::GROUP) {
            CastTarget::Char(caster)
        } else if def.targets(
            TargetFlags::CHAR_ROOM
                | TargetFlags::CHAR_WORLD
                | TargetFlags::FIGHT_VICT
                | TargetFlags::SELF_ONLY,
        ) {
            return Err(CastError::NeedTarget(false));
        } else if def.targets(
            TargetFlags::OBJ_INV | TargetFlags::OBJ_ROOM | TargetFlags::OBJ_WORLD | TargetFlags::OBJ_EQUIP,
        ) {
            return Err(CastError::NeedTarget(true));
        } else {
            CastTarget::None
        };

        if let CastTarget::Char(id) = target {
            if def.targets(TargetFlags::SELF_ONLY) && id != caster {
                return Err(CastError::SelfOnly);
            }
            if def.targets(TargetFlags::NOT_SELF) && id == caster {
                return Err(CastError::NotSelf);
            }
            if def.is_violent_damage() && id == caster {
                return Err(CastError::SelfViolent);
            }
        }
        Ok(target)
    }

    fn target_by_name(&self, caster: CharId, def: &SpellDef, name: &str) -> Option<CastTarget> {
        let c = self.char(caster)?;
        if def.targets(TargetFlags::CHAR_ROOM | TargetFlags::SELF_ONLY | TargetFlags::NOT_SELF) {
            if let Some(id) = self.find_char_in_room(caster, name) {
                return Some(CastTarget::Char(id));
            }
        }
        if def.targets(TargetFlags::CHAR_WORLD) {
            if let Some(id) = self.find_char_in_world(caster, name) {
                return Some(CastTarget::Char(id));
            }
        }
        if def.targets(TargetFlags::OBJ_INV) {
            if let Some(id) = self.find_object(c.inventory.iter().copied(), name) {
                return Some(CastTarget::Object(id));
            }
        }
        if def.targets(TargetFlags::OBJ_EQUIP) {
            if let Some(id) = self.find_object(c.equipment.iter().flatten().copied(), name) {
                return Some(CastTarget::Object(id));
            }
        }
        if def.targets(TargetFlags::OBJ_ROOM) {
            let here = c.room.map(|r| self.objects_in_room(r)).unwrap_or_default();
            if let Some(id) = self.find_object(here, name) {
                return Some(CastTarget::Object(id));
            }
        }
        if def.targets(TargetFlags::OBJ_WORLD) {
            if let Some(id) = self.find_object(self.objects().map(|o| o.id), name) {
                return Some(CastTarget::Object(id));
            }
        }
        None
    }

    /// Target used when no argument was given
    fn default_target(&self, caster: CharId, def: &SpellDef) -> Option<CastTarget> {
        let c = self.char(caster)?;
        let opponent = c.fighting().filter(|&opp| self.same_room(caster, opp));
        if def.targets(TargetFlags::FIGHT_SELF) && c.fighting().is_some() {
            return Some(CastTarget::Char(caster));
        }
        if def.targets(TargetFlags::FIGHT_VICT) {
            if let Some(opp) = opponent {
                return Some(CastTarget::Char(opp));
            }
        }
        if def.targets(TargetFlags::CHAR_ROOM | TargetFlags::SELF_ONLY) && !def.violent {
            return Some(CastTarget::Char(caster));
        }
        None
    }

    /// The `cast` command; a refusal is also sent to the caster
    pub fn do_cast(&mut self, caster: CharId, input: &str, voice: Voice) -> Result<SpellOutcome, CastError> {
        let result = self.try_cast(caster, input, voice);
        if let Err(err) = &result {
            if !matches!(err, CastError::NotInWorld(_)) {
                self.send(caster, &err.to_string());
            }
        }
        result
    }

    fn try_cast(&mut self, caster: CharId, input: &str, voice: Voice) -> Result<SpellOutcome, CastError> {
        let c = self.char(caster).ok_or(CastError::NotInWorld(caster))?;
        if c.is_npc() {
            return Err(CastError::NpcCannotCast);
        }
        let immortal = c.is_immortal();

        let (spell, arg) = self.parse_cast_input(input)?;
        let def = self.catalog.get(spell).cloned().ok_or(CastError::UnknownSpell)?;
        if !def.enabled {
            return Err(CastError::Disabled);
        }
        let c = self.char(caster).ok_or(CastError::NotInWorld(caster))?;
        if !immortal && c.skill(spell) == 0 {
            return Err(CastError::NotKnown);
        }
        if c.position < def.min_position {
            return Err(CastError::Position(c.position));
        }
        let level = c.level;
        let proficiency = c.skill(spell).max(if immortal { 100 } else { 0 });

        let target = self.resolve_cast_target(caster, &def, &arg)?;
        let victim = target.char();
        let obj = target.object();

        let cost = self.mana_cost(caster, victim, spell, voice);
        let mana = self.char(caster).map_or(0, |c| c.mana);
        if !immortal && mana < cost {
            return Err(CastError::NoMana);
        }

        let utterance = format!("$n utters the words, '{}'.", def.name);
        self.act(&utterance, caster, None, None, Audience::Room);

        let cast = Cast { caster, spell, level, style: CastStyle::Spell };
        let effectiveness = match def.effectiveness.as_ref() {
            Some(f) => self.eval_formula(f, &cast, victim, 100),
            None => 100,
        };
        let chance = proficiency as i32 * effectiveness / 100;

        if !immortal && self.rng.number(1, 101) > chance {
            debug!(%caster, %spell, chance, "cast failed");
            if let Some(c) = self.char_mut(caster) {
                c.wait_ticks = PULSE_VIOLENCE as i32;
                if def.kind == SpellKind::Spell {
                    c.mana = (c.mana - cost / 2).max(0);
                }
            }
            self.send(caster, "You lost your concentration!");
            if let Some(v) = victim {
                let provoked = def.violent
                    && v != caster
                    && self
                        .char(v)
                        .is_some_and(|t| t.is_npc() && t.fighting().is_none() && t.awake());
                if provoked {
                    self.set_fighting(v, caster);
                }
            }
            return Ok(SpellOutcome::Failed);
        }

        let outcome = self.call_magic(caster, victim, obj, spell, level, CastStyle::Spell);

        let delay = match def.delay.as_ref() {
            Some(f) => self.eval_formula(f, &cast, victim, PULSE_VIOLENCE as i32),
            None => PULSE_VIOLENCE as i32,
        };
        let max_delay = self.config.max_cast_delay;
        if let Some(c) = self.char_mut(caster) {
            c.wait_ticks = delay.clamp(0, max_delay);
            if !immortal {
                c.mana = (c.mana - cost).max(0);
            }
        }
        Ok(outcome)
    }
}
