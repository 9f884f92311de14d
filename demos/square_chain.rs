use rand::{rngs::StdRng, SeedableRng};
use smallwood::{
    DecsConfig, Field, Protocol, ProtocolConfig, ShakeHasher, SquareChain, TreeConfig, Witness,
};
use tracing_subscriber::EnvFilter;

fn main() -> smallwood::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Toy instance: a column of repeated squarings 2 -> 4 -> 16 modulo 101.
    let pacs = SquareChain::new(Field::new(101), 3, 2, 16)?;
    let witness = Witness::from_rows(vec![vec![2, 4], vec![4, 16], vec![16, 54]])?;
    let mut config = ProtocolConfig::new(1, 2, TreeConfig::new(16, vec![4, 4]), DecsConfig::new(10, 2));
    config.layout_beta = 2;
    let protocol = Protocol::new(pacs, ShakeHasher, config)?;
    let proof = protocol.prove(&witness)?;
    println!(
        "toy chain: {} byte proof, verified = {}",
        proof.len(),
        protocol.verify(&proof)
    );

    // A longer chain over a 31-bit field, linked across columns.
    let field = Field::new(2_013_265_921);
    let mut rng = StdRng::seed_from_u64(2024);
    let (pacs, witness) = SquareChain::random_instance(field, 8, 16, &mut rng)?;
    let target = pacs.target();
    let mut config = ProtocolConfig::new(
        3,
        3,
        TreeConfig::new(256, vec![4, 4, 4, 4]).with_truncation(1).with_expansion(),
        DecsConfig::new(24, 6),
    );
    config.layout_beta = 2;
    let protocol = Protocol::new(pacs, ShakeHasher, config)?;
    let (proof, stats) = protocol.prove_with_stats(&mut rng, &witness, b"square-chain demo")?;
    println!(
        "linked chain: x^(2^{}) = {} in {} attempt(s), {:?} total",
        witness.nb_cols() * (witness.nb_rows() - 1),
        target,
        stats.attempts,
        stats.total_duration
    );
    for (stage, duration) in &stats.stage_durations {
        println!("  {stage:<12} {duration:?}");
    }
    let security = protocol.security();
    println!(
        "  proof: {} bytes (max {}), estimated security {:.1} bits",
        proof.len(),
        protocol.proof_size(),
        security.bits()
    );
    if protocol.verify_with_binding(&proof, b"square-chain demo") {
        println!("Proof verified.");
        Ok(())
    } else {
        eprintln!("Verification failed.");
        std::process::exit(1);
    }
}
