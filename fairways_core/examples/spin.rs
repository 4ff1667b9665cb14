use fairways_core::{build_reel_set, play_round, GameConfig, GameMode, HashChain};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Three chained rounds on the default game
    let config = GameConfig::default();
    let reels = build_reel_set(&config, GameMode::Base)?;
    let mut chain = HashChain::new("example-server-seed", None);
    println!("server_seed_hash={}", chain.commitment().server_seed_hash());

    for nonce in 1..=3 {
        let seed = chain.next_round("example-client-seed", nonce)?;
        let outcome = play_round(&config, &reels, &seed, 1.0)?;
        chain.record(&seed)?;
        println!(
            "nonce={} positions={:?} cascades={} win={} spin_hash={}",
            nonce,
            outcome.reel_positions,
            outcome.cascades.len(),
            outcome.total_win,
            outcome.spin_hash.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
