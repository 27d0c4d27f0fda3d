//! Coordination of all targets on one unit.
//!
//! [`TargetRegistry`] owns the targets, the scoring endpoint and the event
//! handler. The control loop calls [`TargetRegistry::update`] once per tick:
//! it answers at most one pending scoring request and then reports the IR
//! state of every target to the handler.
//!
//! Handler methods run synchronously inside `update`. They must return
//! quickly and must not call back into the registry.

use alloc::{
    boxed::Box,
    vec::Vec,
};
use core::fmt;

use embedded_hal::{
    delay::DelayNs,
    i2c::I2c,
};

use crate::{
    network::{
        self,
        Credentials,
        NetworkConfig,
        Station,
    },
    protocol::{
        GUN_NUM_PARAM,
        INIT_PATH,
        Request,
        Response,
        Route,
        SHOOT_PATH,
        ScoringEndpoint,
        parse_gun_number,
    },
    target::Target,
};

/// Receiver rotary switches select ids 0..=15.
pub const MAX_TARGETS: usize = 16;

/// Hooks the presentation layer binds to its LEDs.
pub trait TargetEvents {
    /// A new round starts; called before the targets are revived.
    fn on_init(&mut self);

    /// Called every tick for a target whose receiver currently sees a beam.
    fn on_receive_ir(&mut self, target_id: u8, alive: bool);

    /// Called every tick for a target whose receiver sees nothing.
    fn on_not_receive_ir(&mut self, target_id: u8, alive: bool);

    /// `target_id` was credited with a shot from `gun_num`.
    fn on_hit(&mut self, target_id: u8, gun_num: u8);
}

/// Unit-level settings fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitConfig<'a> {
    /// Selects the unit's network address; must differ between units.
    pub unit_id: u8,
    pub target_count: usize,
    /// Join this network during `begin`; `None` runs the unit offline.
    pub network: Option<Credentials<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    NoTargets,
    TooManyTargets(usize),
    /// Networking was requested but no static address exists for this unit id.
    InvalidUnitId(u8),
    /// The scoring endpoint failed to start.
    Endpoint(E),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTargets => write!(f, "no targets configured"),
            Self::TooManyTargets(n) => {
                write!(f, "{n} targets configured, at most {MAX_TARGETS} supported")
            }
            Self::InvalidUnitId(id) => write!(f, "unit id {id} has no network address"),
            Self::Endpoint(e) => write!(f, "scoring endpoint failed to start: {e:?}"),
        }
    }
}

/// All targets of one unit plus the scoring endpoint they answer on.
pub struct TargetRegistry<I, S, H> {
    unit_id: u8,
    online: bool,
    targets: Box<[Target<I>]>,
    endpoint: S,
    events: H,
}

impl<I, S, H> TargetRegistry<I, S, H>
where
    I: I2c,
    S: ScoringEndpoint,
    H: TargetEvents,
{
    /// One-time setup: create the targets, join the network if configured,
    /// then start the scoring endpoint.
    ///
    /// `make_device` is called once per target id, in order, and returns that
    /// target's handle on the shared I²C bus. A failed network join is logged
    /// and does not fail `begin`.
    pub fn begin<F, W, D>(
        config: &UnitConfig<'_>,
        mut make_device: F,
        mut endpoint: S,
        events: H,
        station: &mut W,
        delay: &mut D,
    ) -> Result<Self, Error<S::Error>>
    where
        F: FnMut(u8) -> I,
        W: Station,
        D: DelayNs,
    {
        match config.target_count {
            0 => return Err(Error::NoTargets),
            n if n > MAX_TARGETS => return Err(Error::TooManyTargets(n)),
            _ => {}
        }
        // the unit id only selects the static address
        let net_config = config
            .network
            .map(|credentials| {
                NetworkConfig::for_unit(config.unit_id, credentials)
                    .ok_or(Error::InvalidUnitId(config.unit_id))
            })
            .transpose()?;

        let targets: Box<[Target<I>]> = (0_u8..)
            .take(config.target_count)
            .map(|id| Target::new(id, make_device(id)))
            .collect();
        info!(
            "unit {}: {} targets created",
            config.unit_id,
            config.target_count
        );

        let online = net_config.is_some_and(|net| network::join(station, &net, delay));

        endpoint.start().map_err(Error::Endpoint)?;
        info!("scoring endpoint on {} and {}", SHOOT_PATH, INIT_PATH);

        Ok(Self {
            unit_id: config.unit_id,
            online,
            targets,
            endpoint,
            events,
        })
    }

    /// One control-loop tick.
    ///
    /// Answers at most one pending request first, so a hit taken this tick
    /// is already visible as `alive == false` in this tick's IR callbacks.
    pub fn update(&mut self) {
        if let Some(request) = self.endpoint.poll() {
            let response = self.handle(&request);
            if self.endpoint.respond(&response).is_err() {
                warn!("failed to answer {}", request.path.as_str());
            }
        }

        for target in self.targets.iter_mut() {
            let id = target.id();
            let alive = target.is_alive();
            if target.is_receiving_ir() {
                self.events.on_receive_ir(id, alive);
            } else {
                self.events.on_not_receive_ir(id, alive);
            }
        }
    }

    /// Route one request and build its reply. Used by `update`; transports
    /// that push requests may call it directly.
    ///
    /// A `/shoot` whose `gun_num` is missing, not a number in 1..=255, or `0`
    /// is a miss: nothing changes and the reply is `target=0`. Receivers
    /// report 0 when they see no beam, so no target is credited for gun 0.
    pub fn handle(&mut self, request: &Request) -> Response {
        match request.route() {
            Some(Route::Shoot) => self.handle_shoot(request.param(GUN_NUM_PARAM)),
            Some(Route::Init) => self.handle_init(),
            None => {
                warn!("no route for {}", request.path.as_str());
                Response::not_found()
            }
        }
    }

    /// Ids of targets whose receiver does not answer, ascending.
    pub fn error_targets(&mut self) -> Vec<u8> {
        self.targets
            .iter_mut()
            .filter_map(|target| (!target.is_connected()).then(|| target.id()))
            .collect()
    }

    pub const fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Whether the network join in `begin` succeeded.
    pub const fn is_online(&self) -> bool {
        self.online
    }

    pub fn targets(&self) -> &[Target<I>] {
        &self.targets
    }

    pub const fn events(&self) -> &H {
        &self.events
    }

    pub const fn events_mut(&mut self) -> &mut H {
        &mut self.events
    }

    pub const fn endpoint_mut(&mut self) -> &mut S {
        &mut self.endpoint
    }

    fn handle_shoot(&mut self, gun_num: Option<&str>) -> Response {
        let Some(gun_num) = parse_gun_number(gun_num) else {
            return Response::target(0);
        };
        match self.credit_hit(gun_num) {
            Some(_) => Response::target(gun_num),
            None => Response::target(0),
        }
    }

    /// Credit the first live target, by ascending id, whose receiver last saw
    /// `gun_num`. At most one target is credited.
    fn credit_hit(&mut self, gun_num: u8) -> Option<u8> {
        for target in self.targets.iter_mut() {
            if !target.is_alive() {
                continue;
            }
            if target.gun_number() == gun_num {
                let id = target.id();
                target.set_alive(false);
                info!("target {} hit by gun {}", id, gun_num);
                self.events.on_hit(id, gun_num);
                return Some(id);
            }
        }
        None
    }

    fn handle_init(&mut self) -> Response {
        self.events.on_init();
        for target in self.targets.iter_mut() {
            target.set_alive(true);
        }
        info!("round initialized, {} targets alive", self.targets.len());
        Response::initialized()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn error_messages() {
        let e: Error<()> = Error::TooManyTargets(20);
        assert_eq!(e.to_string(), "20 targets configured, at most 16 supported");
        let e: Error<&str> = Error::Endpoint("port busy");
        assert_eq!(e.to_string(), "scoring endpoint failed to start: \"port busy\"");
        let e: Error<()> = Error::InvalidUnitId(99);
        assert_eq!(e.to_string(), "unit id 99 has no network address");
    }
}
