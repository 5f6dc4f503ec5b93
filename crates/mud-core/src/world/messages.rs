//! Player-visible output
//!
//! The engine never writes to a socket. It expands `act`-style templates and
//! hands the finished lines to a [`Messenger`].
//!
//! Template codes:
//! - `$n` / `$N`: actor / victim name as seen by the reader
//! - `$e` / `$E`: subject pronoun (he, she, it)
//! - `$m` / `$M`: object pronoun (him, her, it)
//! - `$s` / `$S`: possessive pronoun (his, her, its)
//! - `$p`: short description of the object
//! - `$$`: a literal `$`

use std::cell::RefCell;
use std::rc::Rc;

use super::CombatWorld;
use crate::character::{CharId, Character, Position};
use crate::object::ObjectId;

/// Delivers finished lines of text to characters
pub trait Messenger {
    fn deliver(&mut self, to: CharId, text: &str);
}

/// In-memory messenger that records everything it is given
///
/// Clones share one buffer, so a test keeps a clone and inspects it after
/// handing the original to the world.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    lines: Rc<RefCell<Vec<(CharId, String)>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line sent to `ch`, oldest first
    pub fn lines_for(&self, ch: CharId) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(to, _)| *to == ch)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Whether any line sent to `ch` contains `needle`
    pub fn saw(&self, ch: CharId, needle: &str) -> bool {
        self.lines
            .borrow()
            .iter()
            .any(|(to, text)| *to == ch && text.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl Messenger for MessageLog {
    fn deliver(&mut self, to: CharId, text: &str) {
        self.lines.borrow_mut().push((to, text.to_string()));
    }
}

/// Who receives an `act` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The actor only
    Actor,
    /// The victim only, even when asleep
    Victim,
    /// Everyone awake in the actor's room except the actor
    Room,
    /// Everyone awake in the actor's room except actor and victim
    RoomButVictim,
}

pub(crate) fn capitalize(mut text: String) -> String {
    if let Some(first) = text.chars().next() {
        if first.is_lowercase() {
            let upper: String = first.to_uppercase().collect();
            text.replace_range(..first.len_utf8(), &upper);
        }
    }
    text
}

impl CombatWorld {
    /// Name of `ch` as `viewer` perceives it
    pub fn pers(&self, ch: &Character, viewer: CharId) -> String {
        match self.char(viewer) {
            Some(v) if !v.can_see(ch) => "someone".to_string(),
            _ => ch.short_descr.clone(),
        }
    }

    fn expand(
        &self,
        template: &str,
        actor: &Character,
        obj: Option<ObjectId>,
        victim: Option<&Character>,
        reader: CharId,
    ) -> String {
        let mut out = String::with_capacity(template.len() + 16);
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            let Some(code) = chars.next() else {
                out.push('$');
                break;
            };
            match code {
                'n' => out.push_str(&self.pers(actor, reader)),
                'e' => out.push_str(actor.sex.subject()),
                'm' => out.push_str(actor.sex.object()),
                's' => out.push_str(actor.sex.possessive()),
                'N' | 'E' | 'M' | 'S' => match victim {
                    Some(v) => match code {
                        'N' => out.push_str(&self.pers(v, reader)),
                        'E' => out.push_str(v.sex.subject()),
                        'M' => out.push_str(v.sex.object()),
                        _ => out.push_str(v.sex.possessive()),
                    },
                    None => out.push_str("someone"),
                },
                'p' => match obj.and_then(|id| self.object(id)) {
                    Some(o) => out.push_str(&o.short_descr),
                    None => out.push_str("something"),
                },
                '$' => out.push('$'),
                other => {
                    out.push('$');
                    out.push(other);
                }
            }
        }
        capitalize(out)
    }

    /// Expand `template` and send it to `to`
    pub fn act(
        &mut self,
        template: &str,
        actor: CharId,
        obj: Option<ObjectId>,
        victim: Option<CharId>,
        to: Audience,
    ) {
        if template.is_empty() {
            return;
        }
        let Some(actor_ch) = self.char(actor) else {
            return;
        };
        let victim_ch = victim.and_then(|v| self.char(v));

        let readers: Vec<CharId> = match to {
            Audience::Actor => {
                if actor_ch.position > Position::Sleeping {
                    vec![actor]
                } else {
                    Vec::new()
                }
            }
            Audience::Victim => victim_ch
                .filter(|v| v.position > Position::Dead && v.id != actor)
                .map(|v| vec![v.id])
                .unwrap_or_default(),
            Audience::Room | Audience::RoomButVictim => match actor_ch.room {
                Some(room) => self
                    .chars_in_room(room)
                    .into_iter()
                    .filter(|&id| id != actor)
                    .filter(|&id| !(to == Audience::RoomButVictim && Some(id) == victim))
                    .filter(|&id| self.char(id).is_some_and(Character::awake))
                    .collect(),
                None => Vec::new(),
            },
        };

        let lines: Vec<(CharId, String)> = readers
            .into_iter()
            .map(|reader| (reader, self.expand(template, actor_ch, obj, victim_ch, reader)))
            .collect();
        for (reader, line) in lines {
            self.messenger.deliver(reader, &line);
        }
    }

    /// Send a literal line to one character
    pub fn send(&mut self, to: CharId, text: &str) {
        self.messenger.deliver(to, text);
    }

    /// Send a literal line to everyone awake in `room`
    pub fn send_to_room(&mut self, room: super::RoomId, text: &str, except: Option<CharId>) {
        let readers: Vec<CharId> = self
            .chars_in_room(room)
            .into_iter()
            .filter(|&id| Some(id) != except)
            .filter(|&id| self.char(id).is_some_and(Character::awake))
            .collect();
        for reader in readers {
            self.messenger.deliver(reader, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AffectFlags, Class, Sex};
    use crate::world::{Room, RoomId};

    fn world() -> (CombatWorld, MessageLog, CharId, CharId, CharId) {
        let log = MessageLog::new();
        let mut w = CombatWorld::new(7);
        w.set_messenger(Box::new(log.clone()));
        w.rooms.insert(Room::new(RoomId(1), "Arena"));
        let mut alys = Character::player(CharId(0), "Alys", Class::Warrior, 10);
        alys.sex = Sex::Female;
        let a = w.spawn(alys, RoomId(1));
        let b = w.spawn(Character::npc(CharId(0), "orc", "an orc", 5), RoomId(1));
        let c = w.spawn(Character::player(CharId(0), "Bryn", Class::Cleric, 3), RoomId(1));
        (w, log, a, b, c)
    }

    #[test]
    fn test_act_audiences() {
        let (mut w, log, a, b, c) = world();
        w.act("$n hits $N with $s fist.", a, None, Some(b), Audience::RoomButVictim);
        w.act("$n hits you.", a, None, Some(b), Audience::Victim);
        w.act("You hit $N.", a, None, Some(b), Audience::Actor);

        assert_eq!(log.lines_for(c), vec!["Alys hits an orc with her fist."]);
        assert_eq!(log.lines_for(b), vec!["Alys hits you."]);
        assert_eq!(log.lines_for(a), vec!["You hit an orc."]);
    }

    #[test]
    fn test_unseen_actor_is_someone() {
        let (mut w, log, a, b, c) = world();
        if let Some(orc) = w.char_mut(b) {
            orc.innate = AffectFlags::INVISIBLE;
            orc.recompute_flags();
        }
        w.act("$n growls.", b, None, None, Audience::Room);
        assert_eq!(log.lines_for(a), vec!["Someone growls."]);
        assert_eq!(log.lines_for(c), vec!["Someone growls."]);
    }

    #[test]
    fn test_sleepers_miss_room_lines() {
        let (mut w, log, a, b, c) = world();
        if let Some(bryn) = w.char_mut(c) {
            bryn.position = Position::Sleeping;
        }
        w.act("$n shouts.", a, None, None, Audience::Room);
        assert!(log.lines_for(c).is_empty());
        assert_eq!(log.lines_for(b).len(), 1);
    }

    #[test]
    fn test_literal_dollar_and_unknown_codes() {
        let (mut w, log, a, _, _) = world();
        w.act("costs $$5 $x", a, None, None, Audience::Actor);
        assert_eq!(log.lines_for(a), vec!["Costs $5 $x"]);
    }
}
