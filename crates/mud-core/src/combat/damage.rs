//! The damage pipeline
//!
//! Every source of harm funnels through [`CombatWorld::damage`]: melee
//! blows, spells, skills, aura reflection and poison. The order of the
//! steps matters; mitigation happens before hit points change, and the
//! death flow runs last.

use tracing::{debug, error, info};

use super::{DamageCause, DamageResult};
use crate::character::{AffectFlags, CharId, NpcFlags, PlayerFlags, Position, PrefFlags};
use crate::world::{Audience, CombatWorld};

impl CombatWorld {
    /// Apply `dam` points of damage from `ch` to `victim`
    ///
    /// `ch == victim` marks self-inflicted or environmental damage, which
    /// skips the attack bookkeeping and awards nothing.
    pub fn damage(&mut self, ch: CharId, victim: CharId, dam: i32, cause: DamageCause) -> DamageResult {
        let Some(v) = self.char(victim) else {
            return DamageResult::Dealt(0);
        };
        if v.room.is_none() {
            return DamageResult::Dealt(0);
        }
        let hostile = ch != victim;

        if v.position == Position::Dead {
            error!(%victim, "attempt to damage a corpse");
            self.die(victim, hostile.then_some(ch));
            return DamageResult::Killed;
        }

        if hostile {
            if let Some(refusal) = self.damage_refused(victim) {
                self.act(refusal, ch, None, Some(victim), Audience::Actor);
                return DamageResult::Dealt(0);
            }
        }

        if !self.scripts.before_damage(ch, victim, dam) {
            debug!(%ch, %victim, dam, "damage vetoed by script");
            return DamageResult::Dealt(0);
        }

        if hostile && cause != DamageCause::Suffering {
            self.engage(ch, victim);
        }

        let dam = self.mitigate(ch, victim, dam, cause);

        let Some(v) = self.char_mut(victim) else {
            return DamageResult::Dealt(0);
        };
        let victim_level = v.level as i64;
        let hit = v.hit();
        v.set_hit(hit - dam);
        let position = v.position;
        let max_hit = v.max_hit;
        let hit = v.hit();

        if hostile {
            self.gain_exp(ch, victim_level * dam as i64);
        }
        self.notify_hit_percent(victim);
        debug!(%ch, %victim, dam, hit, %position, "damage applied");

        self.report_damage(ch, victim, dam, cause);

        if let Some((room_line, self_line)) = position.condition_message() {
            self.act(room_line, victim, None, None, Audience::Room);
            self.send(victim, self_line);
        } else {
            if dam > max_hit / 4 {
                self.send(victim, "That really did HURT!");
            }
            if hit < max_hit / 4 {
                self.send(victim, "You wish that your wounds would stop BLEEDING so much!");
            }
            if hostile {
                self.check_flee(victim);
            }
        }

        // Survivors knocked out of the fight stop swinging
        let knocked_out = self
            .char(victim)
            .is_some_and(|v| v.position <= Position::Stunned && v.fighting().is_some());
        if knocked_out {
            self.stop_fighting(victim);
        }

        if position == Position::Dead {
            if hostile && self.char(ch).is_some() {
                let grouped = self.char(ch).is_some_and(|c| c.is_affected(AffectFlags::GROUP));
                if grouped {
                    self.group_gain(ch, victim);
                } else {
                    self.solo_gain(ch, victim);
                }
            }
            if let Some(v) = self.char(victim) {
                if !v.is_npc() {
                    let room = v.room;
                    let killer = if hostile {
                        self.char(ch).map(|c| c.short_descr.clone())
                    } else {
                        None
                    };
                    info!(
                        victim = %v.short_descr,
                        killer = killer.as_deref().unwrap_or("misfortune"),
                        room = ?room,
                        "player killed"
                    );
                }
            }
            self.die(victim, hostile.then_some(ch));
            return DamageResult::Killed;
        }

        DamageResult::Dealt(dam)
    }

    /// Template explaining why `victim` may not be hurt here, if it may not
    fn damage_refused(&self, victim: CharId) -> Option<&'static str> {
        let v = self.char(victim)?;
        let peaceful = v.room.is_some_and(|r| self.rooms.is_peaceful(r));
        if peaceful {
            return Some("This room just has such a peaceful, easy feeling...");
        }
        if v.npc_flagged(NpcFlags::NO_KILL) {
            return Some("$N is beyond your reach.");
        }
        None
    }

    /// Attack bookkeeping: both sides fight, pets turn, the attacker shows
    /// itself
    fn engage(&mut self, ch: CharId, victim: CharId) {
        let (ch_idle, ch_up) = match self.char(ch) {
            Some(c) => (c.fighting().is_none(), c.position > Position::Stunned),
            None => return,
        };
        if ch_idle && ch_up {
            self.set_fighting(ch, victim);
        }

        let victim_idle = self
            .char(victim)
            .is_some_and(|v| v.fighting().is_none() && v.position > Position::Stunned);
        if victim_idle {
            self.set_fighting(victim, ch);
        }

        if self.char(ch).is_some_and(|c| c.master == Some(victim)) {
            debug!(%ch, %victim, "pet turned on its master");
            self.stop_follower(ch);
        }

        self.appear(ch);

        if let Some(c) = self.char_mut(ch) {
            if c.position == Position::Sleeping {
                c.break_magic_sleep();
                c.position = Position::Standing;
            }
        }
    }

    /// Reduce raw damage by the victim's protections and the global caps
    fn mitigate(&mut self, ch: CharId, victim: CharId, mut dam: i32, cause: DamageCause) -> i32 {
        let Some(v) = self.char(victim) else {
            return 0;
        };

        // Untouchable gods still get drawn into the fight
        let attacker_mortal = self.char(ch).is_some_and(|c| !c.is_immortal());
        if ch != victim && attacker_mortal && v.is_immortal() && v.prf_flagged(PrefFlags::NOHASSLE) {
            return 0;
        }

        if v.is_affected(AffectFlags::DAMAGE_IMMUNE) {
            dam = 0;
        }
        if v.is_affected(AffectFlags::SANCTUARY) && dam >= 2 {
            dam = (dam / 2).max(1);
        }
        if v.is_affected(AffectFlags::GLOBE) {
            dam -= dam / 3;
        }

        if let DamageCause::Reflect(_) = cause {
            let reflector_hit = self.char(ch).map_or(0, |c| c.hit().max(0));
            dam = dam.min(reflector_hit);
        }

        let both_players = !v.is_npc() && self.char(ch).is_some_and(|c| !c.is_npc());
        if ch != victim && both_players && !self.config.pk_allowed {
            self.flag_killer(ch);
            if self.char(ch).is_some_and(|c| c.plr_flagged(PlayerFlags::KILLER)) {
                dam /= 2;
            }
        }

        dam.min(self.config.max_damage_per_hit).max(0)
    }

    /// Mark a player who attacks another player without consent
    fn flag_killer(&mut self, ch: CharId) {
        let Some(c) = self.char_mut(ch) else {
            return;
        };
        if c.is_immortal() || c.plr_flagged(PlayerFlags::KILLER) {
            return;
        }
        if let Some(p) = c.player_data_mut() {
            p.flags.insert(PlayerFlags::KILLER);
        }
        info!(%ch, "player flagged as KILLER");
        self.send(ch, "If you want to be a PLAYER KILLER, so be it...");
    }

    fn report_damage(&mut self, ch: CharId, victim: CharId, dam: i32, cause: DamageCause) {
        match cause {
            DamageCause::Weapon(kind) => self.dam_message(dam, ch, victim, kind),
            DamageCause::Skill(id) | DamageCause::Spell(id) => {
                if !self.skill_message(dam, ch, victim, id) {
                    self.dam_message(dam, ch, victim, Default::default());
                }
            }
            DamageCause::Reflect(aura) => {
                if dam > 0 {
                    self.aura_message(ch, victim, aura);
                }
            }
            DamageCause::Suffering => {}
        }
    }

    /// Automatic retreat of a hurt victim: cowardly NPCs, players below
    /// their wimp level, players without a connection
    fn check_flee(&mut self, victim: CharId) {
        let Some(v) = self.char(victim) else {
            return;
        };
        if v.position <= Position::Stunned || v.fighting().is_none() {
            return;
        }

        if let Some(npc) = v.npc_data() {
            let wimpy = if npc.flags.contains(NpcFlags::WIMPY) {
                self.config.wimpy_flee_percent
            } else {
                0
            };
            let threshold = (wimpy + npc.flee_tendency as i32).min(self.config.max_flee_percent);
            if threshold > 0 && v.hit_percent() < threshold {
                let grouped = v.master.is_some() || !v.followers.is_empty();
                if grouped && self.rng.percent(self.config.group_desert_percent) {
                    self.act("$n abandons $s companions!", victim, None, None, Audience::Room);
                    self.stop_follower(victim);
                }
                self.do_flee(victim);
            }
            return;
        }

        let wimp_level = v.player_data().map_or(0, |p| p.wimp_level);
        if wimp_level > 0 && v.hit() < wimp_level && v.hit() > 0 {
            self.send(victim, "You wimp out, and attempt to flee!");
            self.do_flee(victim);
        }

        let linkless = self.char(victim).is_some_and(|v| {
            v.is_linkless() && v.position > Position::Stunned && v.room.is_some()
        });
        if linkless {
            self.do_flee(victim);
            let still_fighting = self.char(victim).is_some_and(|v| v.fighting().is_some());
            if still_fighting {
                self.rescue_linkless(victim);
            }
        }
    }

    /// Pull a disconnected player out of a fight they could not flee
    fn rescue_linkless(&mut self, victim: CharId) {
        let Some(v) = self.chars.get(&victim) else {
            return;
        };
        let Some(room) = self.rescue.rescue_room(v).or(self.config.rescue_room) else {
            debug!(%victim, "no rescue room for linkless player");
            return;
        };
        self.act("$n is rescued by divine forces.", victim, None, None, Audience::Room);
        self.stop_fighting(victim);
        let opponents: Vec<CharId> = self
            .characters()
            .filter(|c| c.fighting() == Some(victim))
            .map(|c| c.id)
            .collect();
        for opp in opponents {
            self.stop_fighting(opp);
        }
        self.move_char(victim, room);
        info!(%victim, %room, "linkless player rescued");
    }

    /// Report a hit point change to the script layer
    pub(crate) fn notify_hit_percent(&mut self, ch: CharId) {
        if let Some(percent) = self.char(ch).map(|c| c.hit_percent()) {
            self.scripts.hit_percent_changed(ch, percent);
        }
    }
}
