//! Fleeing combat

use strum::IntoEnumIterator;
use tracing::debug;

use crate::character::{CharId, Position};
use crate::consts::FLEE_ATTEMPTS;
use crate::world::{Audience, CombatWorld, Direction};

impl CombatWorld {
    /// Try to run from the current fight through a random open exit
    ///
    /// Returns `true` when the character left the room. Players who get away
    /// from an opponent lose experience in proportion to the damage that
    /// opponent had taken.
    pub fn do_flee(&mut self, ch: CharId) -> bool {
        let Some(c) = self.char(ch) else {
            return false;
        };
        if c.position < Position::Fighting {
            self.send(ch, "You are in pretty bad shape, unable to flee!");
            return false;
        }
        let Some(room) = c.room else {
            return false;
        };
        let directions: Vec<Direction> = Direction::iter().collect();

        for _ in 0..FLEE_ATTEMPTS {
            let Some(&dir) = self.rng.choose(&directions) else {
                break;
            };
            let Some(exit) = self.rooms.get(room).and_then(|r| r.exits.get(&dir)).copied() else {
                continue;
            };
            if exit.closed || !self.rooms.contains(exit.to) {
                continue;
            }

            self.act("$n panics, and attempts to flee!", ch, None, None, Audience::Room);
            let was_fighting = self.char(ch).and_then(|c| c.fighting());

            self.act(&format!("$n flees {}.", dir.name()), ch, None, None, Audience::Room);
            self.move_char(ch, exit.to);
            self.act("$n has arrived.", ch, None, None, Audience::Room);
            self.send(ch, "You flee head over heels.");

            if let Some(opp) = was_fighting {
                let opp_loss = self.char(opp).map(|o| (o.max_hit - o.hit()).max(0) as i64 * o.level as i64);
                let is_npc = self.char(ch).is_some_and(|c| c.is_npc());
                if let (Some(loss), false) = (opp_loss, is_npc) {
                    self.gain_exp(ch, -loss);
                }
                if self.char(opp).and_then(|o| o.fighting()) == Some(ch) {
                    self.stop_fighting(opp);
                }
            }
            self.stop_fighting(ch);

            if let Some(c) = self.chars.get(&ch) {
                if c.is_npc() {
                    self.observer.npc_fled(c, c.hit_percent());
                }
            }
            debug!(%ch, %dir, to = %exit.to, "fled");
            return true;
        }

        self.send(ch, "PANIC!  You couldn't escape!");
        false
    }
}
