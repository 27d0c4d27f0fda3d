//! Joining the gallery's Wi-Fi network.
//!
//! Every unit uses a static address derived from its unit id so the scoring
//! client can reach it without discovery: `192.168.100.(200 + unit_id)`.

use core::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;

pub const GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 100, 1);
pub const PREFIX_LEN: u8 = 24;
/// Host part of unit 0's address.
pub const HOST_OFFSET: u8 = 200;

pub const JOIN_POLL_INTERVAL_MS: u32 = 500;
pub const JOIN_MAX_WAITS: u32 = 30;

/// Pre-shared access point credentials, the same for all units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Station settings for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig<'a> {
    pub credentials: Credentials<'a>,
    pub address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub prefix_len: u8,
}

impl<'a> NetworkConfig<'a> {
    /// `None` if the unit id does not map to a host address on the subnet.
    pub fn for_unit(unit_id: u8, credentials: Credentials<'a>) -> Option<Self> {
        Some(Self {
            credentials,
            address: unit_address(unit_id)?,
            gateway: GATEWAY,
            prefix_len: PREFIX_LEN,
        })
    }

    pub fn netmask(&self) -> Ipv4Addr {
        let host_bits = 32_u32.saturating_sub(u32::from(self.prefix_len));
        Ipv4Addr::from_bits(u32::MAX.checked_shl(host_bits).unwrap_or(0))
    }
}

/// Static address of a unit, `None` once it would run into the broadcast address.
pub fn unit_address(unit_id: u8) -> Option<Ipv4Addr> {
    let host = HOST_OFFSET.checked_add(unit_id).filter(|&host| host < u8::MAX)?;
    let [a, b, c, _] = GATEWAY.octets();
    Some(Ipv4Addr::new(a, b, c, host))
}

/// Wi-Fi station interface supplied by the firmware.
pub trait Station {
    type Error;

    /// Configure the static address and start associating. Must not wait for
    /// the link to come up.
    fn connect(&mut self, config: &NetworkConfig<'_>) -> Result<(), Self::Error>;

    fn is_connected(&mut self) -> bool;
}

/// Station for units that never join a network.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStation;

impl Station for NoStation {
    type Error = core::convert::Infallible;

    fn connect(&mut self, _config: &NetworkConfig<'_>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        false
    }
}

/// Start associating and wait for the link, polling every
/// [`JOIN_POLL_INTERVAL_MS`] for at most [`JOIN_MAX_WAITS`] intervals.
///
/// Returns whether the link came up. Blocks the caller for up to ~15 s.
pub fn join<S: Station, D: DelayNs>(
    station: &mut S,
    config: &NetworkConfig<'_>,
    delay: &mut D,
) -> bool {
    let [a, b, c, d] = config.address.octets();
    info!(
        "connecting to wifi ssid = {}, address = {}.{}.{}.{}",
        config.credentials.ssid,
        a,
        b,
        c,
        d
    );

    if station.connect(config).is_err() {
        error!("failed to start wifi station");
        return false;
    }

    for waits in 0..=JOIN_MAX_WAITS {
        if station.is_connected() {
            info!("connected to wifi after {} polls", waits);
            return true;
        }
        if waits == JOIN_MAX_WAITS {
            break;
        }
        debug!(".");
        delay.delay_ms(JOIN_POLL_INTERVAL_MS);
    }

    error!("failed to connect wifi");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDS: Credentials<'static> = Credentials {
        ssid: "gallery",
        password: "secret",
    };

    struct SlowStation {
        connects: usize,
        polls: u32,
        up_after: Option<u32>,
        refuse: bool,
    }

    impl SlowStation {
        fn new(up_after: Option<u32>) -> Self {
            Self {
                connects: 0,
                polls: 0,
                up_after,
                refuse: false,
            }
        }
    }

    impl Station for SlowStation {
        type Error = ();

        fn connect(&mut self, _config: &NetworkConfig<'_>) -> Result<(), ()> {
            self.connects += 1;
            if self.refuse { Err(()) } else { Ok(()) }
        }

        fn is_connected(&mut self) -> bool {
            self.polls += 1;
            self.up_after.is_some_and(|n| self.polls >= n)
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u64,
        calls: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ms += u64::from(ns) / 1_000_000;
            self.calls += 1;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.total_ms += u64::from(ms);
            self.calls += 1;
        }
    }

    #[test]
    fn address_follows_unit_id() {
        assert_eq!(unit_address(0), Some(Ipv4Addr::new(192, 168, 100, 200)));
        assert_eq!(unit_address(2), Some(Ipv4Addr::new(192, 168, 100, 202)));
        assert_eq!(unit_address(54), Some(Ipv4Addr::new(192, 168, 100, 254)));
        assert_eq!(unit_address(55), None);
        assert_eq!(unit_address(200), None);
    }

    #[test]
    fn config_for_unit() {
        let config = NetworkConfig::for_unit(3, CREDS).unwrap();
        assert_eq!(config.address, Ipv4Addr::new(192, 168, 100, 203));
        assert_eq!(config.gateway, Ipv4Addr::new(192, 168, 100, 1));
        assert_eq!(config.netmask(), Ipv4Addr::new(255, 255, 255, 0));
    }

    #[test]
    fn join_returns_once_link_is_up() {
        let config = NetworkConfig::for_unit(0, CREDS).unwrap();
        let mut station = SlowStation::new(Some(4));
        let mut delay = CountingDelay::default();
        assert!(join(&mut station, &config, &mut delay));
        assert_eq!(station.connects, 1);
        assert_eq!(delay.calls, 3);
        assert_eq!(delay.total_ms, 1_500);
    }

    #[test]
    fn join_gives_up_after_bounded_wait() {
        let config = NetworkConfig::for_unit(0, CREDS).unwrap();
        let mut station = SlowStation::new(None);
        let mut delay = CountingDelay::default();
        assert!(!join(&mut station, &config, &mut delay));
        assert_eq!(delay.calls, JOIN_MAX_WAITS);
        assert_eq!(delay.total_ms, 15_000);
        assert_eq!(station.polls, JOIN_MAX_WAITS + 1);
    }

    #[test]
    fn join_fails_fast_when_station_refuses() {
        let config = NetworkConfig::for_unit(0, CREDS).unwrap();
        let mut station = SlowStation::new(Some(1));
        station.refuse = true;
        let mut delay = CountingDelay::default();
        assert!(!join(&mut station, &config, &mut delay));
        assert_eq!(station.polls, 0);
        assert_eq!(delay.calls, 0);
    }
}
