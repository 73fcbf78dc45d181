//! Generate logged feedback and compare an IPS estimate with the ground truth.
//!
//! Two behavior policies are logged from the same embedding model: one with
//! full support and one where half the actions get zero probability in every
//! round. The evaluation policy is uniform, so IPS is unbiased only under full
//! support.
//!
//! Run:
//! `RUST_LOG=embedlog=debug cargo run --example generate_feedback`

use embedlog::{BanditFeedback, EmbedDatasetConfig, RewardType, SyntheticEmbedDataset, Tensor3};
use tracing_subscriber::EnvFilter;

fn ips(fb: &BanditFeedback, eval: &Tensor3<f64>) -> f64 {
    let total: f64 = fb
        .rounds()
        .map(|r| eval.get(r.round, r.action, 0) / r.pscore * r.reward)
        .sum();
    total / fb.n_rounds as f64
}

fn run(label: &str, cfg: EmbedDatasetConfig, n_rounds: usize) -> Result<(), embedlog::Error> {
    let n_actions = cfg.n_actions;
    let mut ds = SyntheticEmbedDataset::new(cfg)?;
    let fb = ds.obtain_batch_bandit_feedback(n_rounds)?;
    fb.validate(1e-9)?;

    let uniform = Tensor3::from_fn(n_rounds, n_actions, 1, |_, _, _| 1.0 / n_actions as f64);
    let truth = ds.calc_ground_truth_policy_value(&fb.expected_reward, &uniform)?;
    let estimate = ips(&fb, &uniform);
    let mean_reward = fb.reward.iter().sum::<f64>() / n_rounds as f64;

    println!("{label}");
    println!("  dataset        = {}", ds.dataset_name());
    println!("  action_embed   = {:?}", fb.action_embed.shape());
    println!("  mean reward    = {mean_reward:.4}");
    println!("  V(uniform)     = {truth:.4}");
    println!("  IPS(uniform)   = {estimate:.4}");
    println!("  first round    = {:?}", fb.round(0));
    Ok(())
}

fn main() -> Result<(), embedlog::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("embedlog=info")),
        )
        .init();

    let base = EmbedDatasetConfig {
        n_actions: 10,
        dim_context: 5,
        reward_type: RewardType::Binary,
        beta: -1.0,
        n_cat_per_dim: 10,
        n_cat_dim: 3,
        seed: 12345,
        ..EmbedDatasetConfig::default()
    };

    run("full support", base.clone(), 10_000)?;
    run(
        "deficient support (5 of 10 actions zeroed per round)",
        EmbedDatasetConfig {
            n_deficient_actions: 5,
            ..base
        },
        10_000,
    )?;
    Ok(())
}
