//! # Worker kinds.
//!
//! Every kind shares the same supervision contract; they only differ in the
//! command line, the restart policy and what happens to captured output.
//!
//! | Kind           | Command                                         | Restart | Output    |
//! |----------------|-------------------------------------------------|---------|-----------|
//! | `StressCpu`    | `stress-ng -c N`                                | Always  | retained  |
//! | `StressVm`     | `stress-ng --vm N`                              | Always  | retained  |
//! | `Iperf3Server` | `iperf3 -s -B <ipv4 of iface> -p PORT`          | Always  | retained  |
//! | `Iperf3Client` | `iperf3 -c PEER -B <ipv4 of iface> -p PORT`     | Always  | retained  |
//! | `CyclicTest`   | `cyclictest -q -m -S -p PRIO -h 100 -i 200`     | Always  | histogram |
//! | `Custom`       | any argv                                        | Always  | retained  |
//!
//! iperf3 clients finish after their default test duration; they are restarted
//! like every other kind so that the link stays loaded until the stop signal.

use std::net::IpAddr;

use crate::{
    error::WorkerError,
    net,
    policies::RestartPolicy,
    workers::{Command, OutputHandling},
};

/// Number of histogram buckets requested from cyclictest.
pub const CYCLICTEST_HISTOGRAM_SIZE: u32 = 100;
/// cyclictest base interval in microseconds.
pub const CYCLICTEST_INTERVAL_US: u32 = 200;

/// The closed set of load generators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerKind {
    /// CPU stressors on `cores` cores.
    StressCpu { cores: u32 },
    /// Memory (`--vm`) stressors.
    StressVm { workers: u32 },
    /// iperf3 server bound to the IPv4 address of `interface`.
    Iperf3Server {
        interface: String,
        bind: IpAddr,
        port: u16,
    },
    /// iperf3 client sending from `interface` to `peer`.
    Iperf3Client {
        interface: String,
        bind: IpAddr,
        peer: String,
        port: u16,
    },
    /// Real-time latency probe at `priority` (1-100).
    CyclicTest { priority: u8 },
    /// Arbitrary command under the given name.
    Custom { name: String, argv: Vec<String> },
}

impl WorkerKind {
    /// iperf3 server on `interface`; resolves the interface's IPv4 address.
    ///
    /// iperf3 misbehaves with link-local IPv6 binds, so only IPv4 is used.
    pub fn iperf3_server(interface: &str, port: u16) -> Result<Self, WorkerError> {
        Ok(WorkerKind::Iperf3Server {
            interface: interface.to_string(),
            bind: net::ipv4_address(interface)?,
            port,
        })
    }

    /// iperf3 client on `interface` targeting `peer`.
    pub fn iperf3_client(interface: &str, peer: &str, port: u16) -> Result<Self, WorkerError> {
        Ok(WorkerKind::Iperf3Client {
            interface: interface.to_string(),
            bind: net::ipv4_address(interface)?,
            peer: peer.to_string(),
            port,
        })
    }

    /// Arbitrary command; `name` is used in events and logs.
    pub fn custom<S: Into<String>>(name: &str, argv: impl IntoIterator<Item = S>) -> Self {
        WorkerKind::Custom {
            name: name.to_string(),
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// Stable worker name.
    pub fn name(&self) -> String {
        match self {
            WorkerKind::StressCpu { .. } => "stress_cpu".to_string(),
            WorkerKind::StressVm { .. } => "stress_vm".to_string(),
            WorkerKind::Iperf3Server {
                interface, port, ..
            } => format!("iperf3_server_{interface}_{port}"),
            WorkerKind::Iperf3Client {
                interface,
                peer,
                port,
                ..
            } => format!("iperf3_client_{interface}_{peer}_{port}"),
            WorkerKind::CyclicTest { .. } => "cyclictest".to_string(),
            WorkerKind::Custom { name, .. } => name.clone(),
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        match self {
            WorkerKind::StressCpu { cores } => {
                vec!["stress-ng".into(), "-c".into(), cores.to_string()]
            }
            WorkerKind::StressVm { workers } => {
                vec!["stress-ng".into(), "--vm".into(), workers.to_string()]
            }
            WorkerKind::Iperf3Server { bind, port, .. } => vec![
                "iperf3".into(),
                "-s".into(),
                "-B".into(),
                bind.to_string(),
                "-p".into(),
                port.to_string(),
            ],
            WorkerKind::Iperf3Client {
                bind, peer, port, ..
            } => vec![
                "iperf3".into(),
                "-c".into(),
                peer.clone(),
                "-B".into(),
                bind.to_string(),
                "-p".into(),
                port.to_string(),
            ],
            WorkerKind::CyclicTest { priority } => vec![
                "cyclictest".into(),
                "-q".into(),
                "-m".into(),
                "-S".into(),
                "-p".into(),
                priority.to_string(),
                "-h".into(),
                CYCLICTEST_HISTOGRAM_SIZE.to_string(),
                "-i".into(),
                CYCLICTEST_INTERVAL_US.to_string(),
            ],
            WorkerKind::Custom { argv, .. } => argv.clone(),
        }
    }

    /// Resolves the command on `PATH`.
    pub fn command(&self) -> Result<Command, WorkerError> {
        Command::from_argv(&self.argv())
    }

    /// Restart policy of this kind.
    pub fn restart(&self) -> RestartPolicy {
        RestartPolicy::Always
    }

    /// What the controller does with captured output after the run.
    pub fn output(&self) -> OutputHandling {
        match self {
            WorkerKind::CyclicTest { .. } => OutputHandling::Histogram,
            _ => OutputHandling::Retain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_stress_cpu() {
        let k = WorkerKind::StressCpu { cores: 4 };
        assert_eq!(k.name(), "stress_cpu");
        assert_eq!(k.argv(), vec!["stress-ng", "-c", "4"]);
        assert_eq!(k.output(), OutputHandling::Retain);
    }

    #[test]
    fn test_iperf3_server_command() {
        let k = WorkerKind::Iperf3Server {
            interface: "eth0".into(),
            bind: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            port: 5201,
        };
        assert_eq!(k.name(), "iperf3_server_eth0_5201");
        assert_eq!(k.argv(), vec!["iperf3", "-s", "-B", "10.0.0.2", "-p", "5201"]);
    }

    #[test]
    fn test_iperf3_client_command() {
        let k = WorkerKind::Iperf3Client {
            interface: "eth1".into(),
            bind: IpAddr::V4(Ipv4Addr::new(10, 0, 1, 2)),
            peer: "10.0.1.1".into(),
            port: 5202,
        };
        assert_eq!(
            k.argv(),
            vec!["iperf3", "-c", "10.0.1.1", "-B", "10.0.1.2", "-p", "5202"]
        );
        assert_eq!(k.restart(), RestartPolicy::Always);
    }

    #[test]
    fn test_cyclictest_collects_histogram() {
        let k = WorkerKind::CyclicTest { priority: 90 };
        assert_eq!(
            k.argv(),
            vec!["cyclictest", "-q", "-m", "-S", "-p", "90", "-h", "100", "-i", "200"]
        );
        assert_eq!(k.output(), OutputHandling::Histogram);
    }

    #[test]
    fn test_iperf3_server_without_address_fails_naming_interface() {
        let err = WorkerKind::iperf3_server("revpi-no-such-if0", 5201).unwrap_err();
        match err {
            WorkerError::AddressNotFound { interface, .. } => {
                assert_eq!(interface, "revpi-no-such-if0")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_custom_missing_executable() {
        let k = WorkerKind::custom("ghost", ["definitely-not-a-real-binary"]);
        let err = k.command().unwrap_err();
        assert_eq!(err.executable(), Some("definitely-not-a-real-binary"));
    }
}
