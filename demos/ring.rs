//! Forwarding loops in a ring of routers.
//!
//! Router `k` owns `10.k.0.0/16` and forwards the rest of `10.0.0.0/8` to its
//! neighbour, so traffic to an unowned `10.x` prefix circles the ring forever.
//! Optionally, router 0 drops ssh on its ring-facing interface and breaks the loop for it.
//!
//! Run with: `cargo run --example ring`
//! With options: `cargo run --example ring -- -n 6 --acl --strategy all-pairs-closure`

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use bdd_reach::analysis::ReachabilityAnalysis;
use bdd_reach::bdd::Bdd;
use bdd_reach::config::AnalysisConfig;
use bdd_reach::dot::DotConfig;
use bdd_reach::graph::{GraphBuilder, ReachabilityGraph};
use bdd_reach::loops::LoopStrategy;
use bdd_reach::observer::LogObserver;
use bdd_reach::packet::BddPacket;
use bdd_reach::reference::Ref;
use bdd_reach::state::StateNode;
use bdd_reach::transition::Transition;
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "ring")]
#[command(about = "Detect forwarding loops in a ring of routers")]
struct Args {
    /// Number of routers
    #[arg(short, long, default_value_t = 4)]
    n: u8,

    /// Router 0 drops ssh arriving from the ring
    #[arg(long)]
    acl: bool,

    /// Router whose accepted traffic is the query
    #[arg(short, long, default_value_t = 1)]
    target: u8,

    /// Loop detection strategy
    #[arg(short, long, default_value = "bounded-rounds")]
    strategy: String,

    /// Write the graph in DOT format to this file
    #[arg(long)]
    dot: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log: simplelog::LevelFilter,
}

fn parse_strategy(name: &str) -> color_eyre::Result<LoopStrategy> {
    LoopStrategy::ALL
        .into_iter()
        .find(|s| s.to_string() == name)
        .ok_or_else(|| color_eyre::eyre::eyre!("unknown strategy '{}'", name))
}

fn build_ring(packet: &BddPacket, args: &Args) -> color_eyre::Result<ReachabilityGraph> {
    let bdd = packet.bdd();
    let n = args.n;
    let ten = packet.dst_prefix(Ipv4Addr::new(10, 0, 0, 0), 8);
    let ssh = bdd.apply_and(
        packet.dst_port().value(bdd, 22),
        packet.ip_protocol().value(bdd, 6),
    );

    let mut builder = GraphBuilder::new();
    for k in 0..n {
        let host = format!("r{}", k);
        let next = format!("r{}", (k + 1) % n);
        let own = packet.dst_prefix(Ipv4Addr::new(10, k, 0, 0), 16);

        let origin = StateNode::originate_vrf(&host, "default");
        let ring_in = StateNode::pre_in_interface(&host, "ring-in");
        let vrf = StateNode::post_in_vrf(&host, "default");
        let routed = StateNode::pre_out_vrf(&host, "default");
        let out = StateNode::pre_out_edge(&host, "ring-out");
        let out_nat = StateNode::pre_out_edge_post_nat(&host, "ring-out");
        let accept = StateNode::node_accept(&host);

        builder.ingress(origin.clone())?;
        builder.connect(origin, vrf.clone(), Transition::Identity)?;

        if args.acl && k == 0 {
            builder.connect(ring_in.clone(), vrf.clone(), Transition::constraint(-ssh))?;
            builder.connect(ring_in, StateNode::node_drop_acl(&host), Transition::constraint(ssh))?;
        } else {
            builder.connect(ring_in, vrf.clone(), Transition::Identity)?;
        }

        builder.connect(vrf.clone(), accept.clone(), Transition::constraint(own))?;
        builder.connect(vrf.clone(), routed.clone(), Transition::constraint(bdd.apply_diff(ten, own)))?;
        builder.connect(vrf, StateNode::node_drop_no_route(&host), Transition::constraint(-ten))?;
        builder.connect(routed, out.clone(), Transition::Identity)?;
        builder.connect(out, out_nat.clone(), Transition::Identity)?;
        builder.connect(out_nat, StateNode::pre_in_interface(&next, "ring-in"), Transition::Identity)?;

        if k == args.target {
            builder.connect(accept, StateNode::Query, Transition::Identity)?;
        }
    }
    Ok(builder.build()?)
}

/// Destination address of one header in `headers`, unconstrained bits taken as zero.
fn sample_dst(bdd: &Bdd, packet: &BddPacket, headers: Ref) -> Option<Ipv4Addr> {
    let model = bdd.one_sat(headers)?;
    let vars = packet.dst_ip().vars();
    let mut addr = 0u32;
    for (i, var) in vars.iter().enumerate() {
        if model.contains(&(*var as i32)) {
            addr |= 1 << (31 - i);
        }
    }
    Some(Ipv4Addr::from(addr))
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    simplelog::TermLogger::init(
        args.log,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let strategy = parse_strategy(&args.strategy)?;
    let bdd = Arc::new(Bdd::default());
    let packet = BddPacket::new(bdd.clone());

    let time_build = Instant::now();
    let graph = build_ring(&packet, &args)?;
    info!(
        "Built ring of {} routers: {} nodes, {} edges in {:.3} s",
        args.n,
        graph.node_count(),
        graph.edge_count(),
        time_build.elapsed().as_secs_f64()
    );

    let config = AnalysisConfig::default().with_loop_strategy(strategy);
    let analysis = ReachabilityAnalysis::with_config(bdd.clone(), graph, config).with_observer(Arc::new(LogObserver));

    println!("── Reachability of r{} ──\n", args.target);
    for (location, headers) in analysis.reverse_reachable() {
        let count = bdd.sat_count(headers, packet.num_vars());
        println!("{:>16}: {} headers", location.to_string(), count);
    }

    println!("\n── Loops ({}) ──\n", strategy);
    for (location, headers) in analysis.detect_loops() {
        if bdd.is_zero(headers) {
            println!("{:>16}: none", location.to_string());
            continue;
        }
        let count = bdd.sat_count(headers, packet.num_vars());
        match sample_dst(&bdd, &packet, headers) {
            Some(dst) => println!("{:>16}: {} headers, e.g. dst {}", location.to_string(), count, dst),
            None => println!("{:>16}: {} headers", location.to_string(), count),
        }
    }

    if let Some(path) = &args.dot {
        let dot = analysis
            .graph()
            .to_dot_with_config(&DotConfig::default(), &analysis.loop_states())?;
        std::fs::write(path, dot)?;
        info!("Wrote graph to {}", path);
    }

    println!("\nbdd = {:?}", bdd);
    Ok(())
}
