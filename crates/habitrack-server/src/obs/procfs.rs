//! Parsers for Linux host statistics files.
//!
//! Pure functions over file contents so they can be exercised without a real
//! `/proc`. Reading the files is the sampler's job.

use super::sampler::SampleError;

/// Value of `field` from a two-line `prefix` table, as found in
/// `/proc/net/snmp` and `/proc/net/netstat`:
///
/// ```text
/// Tcp: RtoAlgorithm RtoMin ... CurrEstab ... RetransSegs
/// Tcp: 1 200 ... 3 ... 42
/// ```
///
/// The first line starting with `prefix` carries the field names, the next
/// one the values in the same columns.
pub fn parse_netstat_field(content: &str, prefix: &str, field: &str) -> Result<u64, SampleError> {
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        let Some(header) = line.strip_prefix(prefix) else { continue };
        let values = lines
            .next()
            .and_then(|l| l.strip_prefix(prefix))
            .ok_or_else(|| SampleError::Parse(format!("{prefix} header without value line")))?;

        let Some(idx) = header.split_whitespace().position(|name| name == field) else {
            return Err(SampleError::Parse(format!("{prefix} has no {field} column")));
        };
        let raw = values
            .split_whitespace()
            .nth(idx)
            .ok_or_else(|| SampleError::Parse(format!("{prefix} value line too short for {field}")))?;
        return raw
            .parse::<u64>()
            .map_err(|e| SampleError::Parse(format!("{prefix} {field}={raw:?}: {e}")));
    }
    Err(SampleError::Parse(format!("no {prefix} table")))
}

/// `inuse` count from the `TCP:` line of `/proc/net/sockstat`
/// (`TCP: inuse 5 orphan 0 tw 2 alloc 7 mem 1`).
pub fn parse_sockstat_tcp_inuse(content: &str) -> Result<u64, SampleError> {
    let line = content
        .lines()
        .find_map(|l| l.strip_prefix("TCP:"))
        .ok_or_else(|| SampleError::Parse("no TCP: line in sockstat".into()))?;

    let mut it = line.split_whitespace();
    while let Some(key) = it.next() {
        let val = it.next();
        if key == "inuse" {
            let raw = val.ok_or_else(|| SampleError::Parse("TCP inuse without value".into()))?;
            return raw
                .parse::<u64>()
                .map_err(|e| SampleError::Parse(format!("TCP inuse={raw:?}: {e}")));
        }
    }
    Err(SampleError::Parse("no inuse key on TCP: line".into()))
}

/// Aggregate CPU jiffies from the first line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub system: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Percent of time in user and system mode between `prev` and `self`.
    /// A zero-length window yields `(0, 0)`.
    pub fn percent_since(&self, prev: &CpuTimes) -> (f64, f64) {
        let total = self.total.saturating_sub(prev.total);
        if total == 0 {
            return (0.0, 0.0);
        }
        let user = self.user.saturating_sub(prev.user) as f64;
        let system = self.system.saturating_sub(prev.system) as f64;
        (user * 100.0 / total as f64, system * 100.0 / total as f64)
    }
}

/// Parse `cpu  user nice system idle iowait irq softirq steal guest guest_nice`.
///
/// `user` includes `nice`. Guest time is already counted in user time by the
/// kernel, so it is left out of the total.
pub fn parse_cpu_times(content: &str) -> Result<CpuTimes, SampleError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SampleError::Parse("no aggregate cpu line in stat".into()))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse::<u64>().map_err(|e| SampleError::Parse(format!("cpu field {f:?}: {e}"))))
        .collect::<Result<Vec<u64>, _>>()?;
    if fields.len() < 4 {
        return Err(SampleError::Parse(format!("cpu line has {} fields", fields.len())));
    }

    Ok(CpuTimes {
        user: fields[0] + fields[1],
        system: fields[2],
        total: fields.iter().sum(),
    })
}

/// `majflt` (field 12) from `/proc/<pid>/stat`.
///
/// The command name in field 2 may contain spaces and parentheses, so fields
/// are counted from the last `)`.
pub fn parse_major_faults(content: &str) -> Result<u64, SampleError> {
    let close = content
        .rfind(')')
        .ok_or_else(|| SampleError::Parse("no comm field in process stat".into()))?;
    // After ")": state(3) ppid(4) pgrp(5) session(6) tty_nr(7) tpgid(8)
    // flags(9) minflt(10) cminflt(11) majflt(12)
    let raw = content[close + 1..]
        .split_whitespace()
        .nth(9)
        .ok_or_else(|| SampleError::Parse("process stat too short for majflt".into()))?;
    raw.parse::<u64>()
        .map_err(|e| SampleError::Parse(format!("majflt={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netstat_field_from_aligned_lines() {
        let content = "\
IpExt: InNoRoutes InTruncatedPkts
IpExt: 0 0
TcpExt: SyncookiesSent RetransSegs TCPTimeouts
TcpExt: 0 42 7
";
        assert_eq!(parse_netstat_field(content, "TcpExt:", "RetransSegs").unwrap(), 42);
        assert_eq!(parse_netstat_field(content, "TcpExt:", "TCPTimeouts").unwrap(), 7);
    }

    #[test]
    fn netstat_missing_pieces_are_errors() {
        let content = "Tcp: RtoAlgorithm CurrEstab\nTcp: 1 3\n";
        assert_eq!(parse_netstat_field(content, "Tcp:", "CurrEstab").unwrap(), 3);
        assert!(parse_netstat_field(content, "Tcp:", "RetransSegs").is_err());
        assert!(parse_netstat_field(content, "Udp:", "InDatagrams").is_err());
        assert!(parse_netstat_field("Tcp: CurrEstab\n", "Tcp:", "CurrEstab").is_err());
        assert!(parse_netstat_field("Tcp: CurrEstab\nTcp: x\n", "Tcp:", "CurrEstab").is_err());
    }

    #[test]
    fn sockstat_inuse() {
        let content = "sockets: used 290\nTCP: inuse 5 orphan 0 tw 2 alloc 7 mem 1\nUDP: inuse 3 mem 2\n";
        assert_eq!(parse_sockstat_tcp_inuse(content).unwrap(), 5);
        assert!(parse_sockstat_tcp_inuse("UDP: inuse 3\n").is_err());
    }

    #[test]
    fn cpu_times_and_percent() {
        let prev = parse_cpu_times("cpu  100 0 50 850 0 0 0 0 0 0\ncpu0 1 2 3 4\n").unwrap();
        assert_eq!(prev, CpuTimes { user: 100, system: 50, total: 1000 });

        let next = parse_cpu_times("cpu  150 10 80 1160 0 0 0 0 0 0\n").unwrap();
        let (user, system) = next.percent_since(&prev);
        assert!((user - 15.0).abs() < 1e-9);
        assert!((system - 7.5).abs() < 1e-9);
        assert_eq!(next.percent_since(&next), (0.0, 0.0));
    }

    #[test]
    fn major_faults_skip_comm_with_spaces() {
        let stat = "1234 (my (odd) proc) S 1 1234 1234 0 -1 4194560 812 0 17 0 5 3 0 0 20 0";
        assert_eq!(parse_major_faults(stat).unwrap(), 17);
        assert!(parse_major_faults("garbage").is_err());
    }
}
