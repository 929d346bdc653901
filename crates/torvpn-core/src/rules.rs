//! Packet-filter rule planning
//!
//! Builds the ordered list of iptables invocations that route the host
//! through the daemon. Nothing here executes anything; the platform crate
//! turns each [`RuleStep`] into a command.
//!
//! ## Ordering
//!
//! Chains are first-match-wins. Exemption rules are *inserted* at explicit
//! head positions before the catch-all redirect is appended, so an exempt
//! destination never reaches the redirect, even while the plan is being
//! applied.

use crate::network::{Cidr, ExemptNetworks};
use std::fmt;

/// UDP port whose traffic is sent to the daemon's resolver
pub const DNS_PORT: u16 = 53;

/// iptables table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Default `filter` table
    Filter,
    /// `nat` table, where REDIRECT lives
    Nat,
}

impl Table {
    /// Table name as iptables spells it
    pub fn name(&self) -> &'static str {
        match self {
            Table::Filter => "filter",
            Table::Nat => "nat",
        }
    }
}

/// Built-in chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    /// Inbound packets
    Input,
    /// Locally generated packets
    Output,
}

impl Chain {
    /// Chain name as iptables spells it
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Input => "INPUT",
            Chain::Output => "OUTPUT",
        }
    }
}

/// Where a rule lands in its chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// `-A`: after everything already present
    Append,
    /// `-I <n>`: at 1-based position `n`
    Insert(usize),
}

/// Rule verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Let the packet through untouched
    Accept,
    /// Stop traversing this chain
    Return,
    /// Rewrite the destination to a local port
    Redirect {
        /// Local destination port
        to_port: u16,
    },
}

/// One rule to add
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    /// Table the rule belongs to
    pub table: Table,
    /// Chain the rule belongs to
    pub chain: Chain,
    /// Insertion point
    pub placement: Placement,
    /// Match arguments (`-p tcp`, `-d 10.0.0.0/8`, ...)
    pub matcher: Vec<String>,
    /// Verdict
    pub target: Target,
}

impl FilterRule {
    fn new(table: Table, chain: Chain, placement: Placement, matcher: &[&str], target: Target) -> Self {
        Self {
            table,
            chain,
            placement,
            matcher: matcher.iter().map(|s| (*s).to_string()).collect(),
            target,
        }
    }

    /// Rule body without table or placement, used to compare rules
    pub fn spec(&self) -> Vec<String> {
        let mut args = self.matcher.clone();
        args.push("-j".to_string());
        match self.target {
            Target::Accept => args.push("ACCEPT".to_string()),
            Target::Return => args.push("RETURN".to_string()),
            Target::Redirect { to_port } => {
                args.push("REDIRECT".to_string());
                args.push("--to-ports".to_string());
                args.push(to_port.to_string());
            }
        }
        args
    }
}

/// A single packet-filter mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleStep {
    /// Drop every rule in every chain of a table
    Flush(Table),
    /// Add one rule
    Add(FilterRule),
}

impl RuleStep {
    /// Command-line arguments for the packet-filter binary
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let table = match self {
            RuleStep::Flush(table) => *table,
            RuleStep::Add(rule) => rule.table,
        };
        if table != Table::Filter {
            args.push("-t".to_string());
            args.push(table.name().to_string());
        }

        match self {
            RuleStep::Flush(_) => args.push("-F".to_string()),
            RuleStep::Add(rule) => {
                match rule.placement {
                    Placement::Append => {
                        args.push("-A".to_string());
                        args.push(rule.chain.name().to_string());
                    }
                    Placement::Insert(position) => {
                        args.push("-I".to_string());
                        args.push(rule.chain.name().to_string());
                        args.push(position.to_string());
                    }
                }
                args.extend(rule.spec());
            }
        }
        args
    }
}

impl fmt::Display for RuleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleStep::Flush(table) => write!(f, "flush {} table", table.name()),
            RuleStep::Add(rule) => match (rule.target, rule.chain) {
                (Target::Redirect { to_port }, _) => {
                    let proto = rule.matcher.get(1).map_or("traffic", String::as_str);
                    write!(f, "redirect {proto} to port {to_port}")
                }
                (Target::Return, _) => write!(f, "bypass daemon traffic"),
                (Target::Accept, Chain::Input) => write!(f, "accept inbound loopback"),
                (Target::Accept, Chain::Output) if rule.table == Table::Filter => {
                    write!(f, "accept outbound loopback")
                }
                (Target::Accept, Chain::Output) => {
                    let dest = rule.matcher.get(1).map_or("?", String::as_str);
                    write!(f, "exempt {dest}")
                }
            },
        }
    }
}

/// Ports the redirect rules point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPorts {
    /// Transparent proxy port for TCP
    pub tcp: u16,
    /// Daemon resolver port for UDP/53
    pub dns: u16,
}

/// Ordered sequence of [`RuleStep`]s
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RulePlan {
    steps: Vec<RuleStep>,
}

impl RulePlan {
    /// Plan for routing everything but `exempt` through the daemon
    ///
    /// When `daemon_user` is set, packets owned by that user skip the
    /// redirect so the daemon can reach the network itself.
    pub fn install(ports: RedirectPorts, exempt: &ExemptNetworks, daemon_user: Option<&str>) -> Self {
        let mut steps = Self::flush().steps;
        let mut position = 1;

        if let Some(user) = daemon_user {
            steps.push(RuleStep::Add(FilterRule::new(
                Table::Nat,
                Chain::Output,
                Placement::Insert(position),
                &["-m", "owner", "--uid-owner", user],
                Target::Return,
            )));
            position += 1;
        }

        for network in exempt {
            steps.push(Self::exempt_rule(network, position));
            position += 1;
        }

        steps.push(RuleStep::Add(FilterRule::new(
            Table::Nat,
            Chain::Output,
            Placement::Append,
            &["-p", "tcp", "-m", "tcp", "--syn"],
            Target::Redirect { to_port: ports.tcp },
        )));

        let dns_port = DNS_PORT.to_string();
        steps.push(RuleStep::Add(FilterRule::new(
            Table::Nat,
            Chain::Output,
            Placement::Append,
            &["-p", "udp", "--dport", &dns_port],
            Target::Redirect { to_port: ports.dns },
        )));

        steps.push(RuleStep::Add(FilterRule::new(
            Table::Filter,
            Chain::Input,
            Placement::Append,
            &["-i", "lo"],
            Target::Accept,
        )));
        steps.push(RuleStep::Add(FilterRule::new(
            Table::Filter,
            Chain::Output,
            Placement::Append,
            &["-o", "lo"],
            Target::Accept,
        )));

        Self { steps }
    }

    /// Plan that discards every rule in the tables we touch
    pub fn flush() -> Self {
        Self {
            steps: vec![RuleStep::Flush(Table::Filter), RuleStep::Flush(Table::Nat)],
        }
    }

    fn exempt_rule(network: &Cidr, position: usize) -> RuleStep {
        let dest = network.to_string();
        RuleStep::Add(FilterRule::new(
            Table::Nat,
            Chain::Output,
            Placement::Insert(position),
            &["-d", &dest],
            Target::Accept,
        ))
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[RuleStep] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for an empty plan
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<'a> IntoIterator for &'a RulePlan {
    type Item = &'a RuleStep;
    type IntoIter = std::slice::Iter<'a, RuleStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> RedirectPorts {
        RedirectPorts { tcp: 9070, dns: 5353 }
    }

    fn argv(plan: &RulePlan) -> Vec<String> {
        plan.steps().iter().map(|s| s.args().join(" ")).collect()
    }

    #[test]
    fn test_flush_plan() {
        assert_eq!(argv(&RulePlan::flush()), ["-F", "-t nat -F"]);
    }

    #[test]
    fn test_install_plan_defaults() {
        let plan = RulePlan::install(ports(), &ExemptNetworks::local_defaults(), None);
        assert_eq!(
            argv(&plan),
            [
                "-F",
                "-t nat -F",
                "-t nat -I OUTPUT 1 -d 192.168.0.0/16 -j ACCEPT",
                "-t nat -I OUTPUT 2 -d 127.0.0.0/8 -j ACCEPT",
                "-t nat -A OUTPUT -p tcp -m tcp --syn -j REDIRECT --to-ports 9070",
                "-t nat -A OUTPUT -p udp --dport 53 -j REDIRECT --to-ports 5353",
                "-A INPUT -i lo -j ACCEPT",
                "-A OUTPUT -o lo -j ACCEPT",
            ]
        );
    }

    #[test]
    fn test_install_plan_daemon_user_first() {
        let plan = RulePlan::install(ports(), &ExemptNetworks::local_defaults(), Some("debian-tor"));
        let lines = argv(&plan);
        assert_eq!(lines[2], "-t nat -I OUTPUT 1 -m owner --uid-owner debian-tor -j RETURN");
        assert_eq!(lines[3], "-t nat -I OUTPUT 2 -d 192.168.0.0/16 -j ACCEPT");
        assert_eq!(lines[4], "-t nat -I OUTPUT 3 -d 127.0.0.0/8 -j ACCEPT");
    }

    #[test]
    fn test_install_plan_no_exemptions() {
        let plan = RulePlan::install(ports(), &ExemptNetworks::default(), None);
        assert_eq!(plan.len(), 6);
        assert!(matches!(plan.steps()[0], RuleStep::Flush(Table::Filter)));
    }

    #[test]
    fn test_step_labels() {
        let plan = RulePlan::install(ports(), &ExemptNetworks::local_defaults(), None);
        let labels: Vec<String> = plan.steps().iter().map(ToString::to_string).collect();
        assert_eq!(
            labels,
            [
                "flush filter table",
                "flush nat table",
                "exempt 192.168.0.0/16",
                "exempt 127.0.0.0/8",
                "redirect tcp to port 9070",
                "redirect udp to port 5353",
                "accept inbound loopback",
                "accept outbound loopback",
            ]
        );
    }
}
