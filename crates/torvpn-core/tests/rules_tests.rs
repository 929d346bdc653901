//! Integration tests for rule planning

use proptest::prelude::*;
use std::net::Ipv4Addr;
use torvpn_core::rules::{Chain, Placement, Table, Target};
use torvpn_core::{Cidr, ExemptNetworks, RedirectPorts, RulePlan, RuleStep};

/// nat OUTPUT as it looks after every step of `plan` has been applied
fn nat_output(plan: &RulePlan) -> Vec<(Vec<String>, Target)> {
    let mut chain = Vec::new();
    for step in plan {
        match step {
            RuleStep::Flush(Table::Nat) => chain.clear(),
            RuleStep::Flush(Table::Filter) => {}
            RuleStep::Add(rule) if rule.table == Table::Nat && rule.chain == Chain::Output => {
                let entry = (rule.matcher.clone(), rule.target);
                match rule.placement {
                    Placement::Append => chain.push(entry),
                    Placement::Insert(n) => chain.insert(n - 1, entry),
                }
            }
            RuleStep::Add(_) => {}
        }
    }
    chain
}

/// First verdict a TCP SYN to `dest` meets in the chain
fn verdict_for(chain: &[(Vec<String>, Target)], dest: Ipv4Addr) -> Option<Target> {
    chain.iter().find_map(|(matcher, target)| {
        let hit = match matcher.as_slice() {
            [flag, net] if flag == "-d" => net.parse::<Cidr>().is_ok_and(|c| c.contains(dest)),
            [p, proto, ..] if p == "-p" => proto == "tcp",
            _ => false,
        };
        hit.then_some(*target)
    })
}

fn ports() -> RedirectPorts {
    RedirectPorts { tcp: 9070, dns: 5353 }
}

#[test]
fn test_exempt_addresses_accepted() {
    let exempt = ExemptNetworks::parse(["10.0.0.0/8", "192.168.0.0/16"]).unwrap();
    let chain = nat_output(&RulePlan::install(ports(), &exempt, None));

    assert_eq!(verdict_for(&chain, Ipv4Addr::new(10, 1, 2, 3)), Some(Target::Accept));
    assert_eq!(verdict_for(&chain, Ipv4Addr::new(192, 168, 4, 4)), Some(Target::Accept));
    assert_eq!(
        verdict_for(&chain, Ipv4Addr::new(93, 184, 216, 34)),
        Some(Target::Redirect { to_port: 9070 })
    );
}

#[test]
fn test_exemptions_keep_configured_order() {
    let exempt = ExemptNetworks::parse(["172.16.0.0/12", "10.0.0.0/8", "127.0.0.0/8"]).unwrap();
    let chain = nat_output(&RulePlan::install(ports(), &exempt, None));
    let dests: Vec<&str> = chain
        .iter()
        .filter(|(_, t)| *t == Target::Accept)
        .map(|(m, _)| m[1].as_str())
        .collect();
    assert_eq!(dests, ["172.16.0.0/12", "10.0.0.0/8", "127.0.0.0/8"]);
}

#[test]
fn test_flush_plan_empties_nat() {
    let exempt = ExemptNetworks::local_defaults();
    let mut steps: Vec<RuleStep> = RulePlan::install(ports(), &exempt, None).steps().to_vec();
    steps.extend(RulePlan::flush().steps().iter().cloned());

    let mut chain_len = 0usize;
    for step in &steps {
        match step {
            RuleStep::Flush(Table::Nat) => chain_len = 0,
            RuleStep::Add(rule) if rule.table == Table::Nat => chain_len += 1,
            _ => {}
        }
    }
    assert_eq!(chain_len, 0);
}

fn arb_cidr() -> impl Strategy<Value = Cidr> {
    (any::<u32>(), 8u8..=32).prop_map(|(bits, prefix)| Cidr::new(Ipv4Addr::from(bits), prefix).unwrap())
}

proptest! {
    #[test]
    fn prop_exempt_destination_never_redirected(
        nets in prop::collection::vec(arb_cidr(), 0..6),
        pick in any::<prop::sample::Index>(),
        host in any::<u32>(),
    ) {
        let mut unique = Vec::new();
        for net in nets {
            if !unique.contains(&net) {
                unique.push(net);
            }
        }
        prop_assume!(!unique.is_empty());

        let target_net = unique[pick.index(unique.len())];
        let host_bits = if target_net.prefix() == 32 { 0 } else { host & (u32::MAX >> target_net.prefix()) };
        let dest = Ipv4Addr::from(u32::from(target_net.addr()) | host_bits);

        let exempt = ExemptNetworks::new(unique).unwrap();
        let chain = nat_output(&RulePlan::install(ports(), &exempt, Some("debian-tor")));

        prop_assert_eq!(verdict_for(&chain, dest), Some(Target::Accept));
    }

    #[test]
    fn prop_redirects_always_last(nets in prop::collection::vec(arb_cidr(), 0..6)) {
        let mut unique = Vec::new();
        for net in nets {
            if !unique.contains(&net) {
                unique.push(net);
            }
        }
        let exempt = ExemptNetworks::new(unique).unwrap();
        let chain = nat_output(&RulePlan::install(ports(), &exempt, None));

        let first_redirect = chain
            .iter()
            .position(|(_, t)| matches!(t, Target::Redirect { .. }))
            .unwrap();
        let all_redirects = chain[first_redirect..]
            .iter()
            .all(|(_, t)| matches!(t, Target::Redirect { .. }));
        prop_assert!(all_redirects);
        prop_assert_eq!(first_redirect, exempt.len());
    }
}
