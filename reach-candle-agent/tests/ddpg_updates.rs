mod common;
use anyhow::Result;
use common::{agent_config, ToyAgent, DIM_ACT, DIM_OBS};
use reach_candle_agent::{ddpg::Td3Config, util::param_distance};
use reach_core::{
    error::ReachError,
    replay_buffer::{ReplayBuffer, ReplayBufferConfig, Transition},
    Agent, Configurable, ExperienceBufferBase, Policy, ReplayBufferBase,
};
use tempdir::TempDir;

fn filled_buffer(n: usize) -> Result<ReplayBuffer> {
    let config = ReplayBufferConfig::default()
        .capacity(100)
        .dim_obs(DIM_OBS)
        .dim_act(DIM_ACT);
    let mut buffer = ReplayBuffer::build(&config)?;
    let mut rng = fastrand::Rng::with_seed(42);
    for _ in 0..n {
        let s = vec![rng.f32() * 2.0 - 1.0, rng.f32()];
        let a = vec![rng.f32() * 2.0 - 1.0];
        let s_next = vec![s[0] + 0.25 * a[0], 0.5 * s[1]];
        let r = -s_next[0].abs() - s_next[1].abs();
        buffer.push(Transition::new(s, a, r, s_next, false, false))?;
    }
    Ok(buffer)
}

#[test]
fn test_delayed_updates() -> Result<()> {
    for policy_delay in [1, 2, 3] {
        let config = agent_config(8)?.td3(Td3Config::default().policy_delay(policy_delay));
        let mut agent = ToyAgent::build(config)?;
        let mut buffer = filled_buffer(32)?;
        let n_updates = 7;
        let mut n_actor_changes = 0;
        let mut n_target_changes = 0;

        for _ in 0..n_updates {
            let actor = agent.actor().try_clone()?;
            let actor_tgt = agent.target_actor().try_clone()?;
            let critics = agent
                .critics()
                .iter()
                .map(|q| q.try_clone())
                .collect::<Result<Vec<_>>>()?;

            let record = agent.opt(&mut buffer)?;
            assert!(record.is_some());

            // Critics are updated at every step
            for (q, q_prev) in agent.critics().iter().zip(critics.iter()) {
                assert!(param_distance(q.get_varmap(), q_prev.get_varmap())? > 0.0);
            }
            if param_distance(agent.actor().get_varmap(), actor.get_varmap())? > 0.0 {
                n_actor_changes += 1;
            }
            if param_distance(agent.target_actor().get_varmap(), actor_tgt.get_varmap())? > 0.0 {
                n_target_changes += 1;
            }
        }

        assert_eq!(n_actor_changes, n_updates / policy_delay);
        assert_eq!(n_target_changes, n_updates / policy_delay);
        assert_eq!(agent.n_opts(), n_updates);
        assert_eq!(agent.n_actor_updates(), n_updates / policy_delay);
    }
    Ok(())
}

#[test]
fn test_critics_and_targets_at_construction() -> Result<()> {
    let agent = ToyAgent::build(agent_config(8)?.td3(Td3Config::default()))?;
    let qs = agent.critics();
    let qs_tgt = agent.target_critics();
    assert_eq!(qs.len(), 2);
    assert!(param_distance(qs[0].get_varmap(), qs[1].get_varmap())? > 0.0);
    assert_eq!(param_distance(qs[0].get_varmap(), qs_tgt[0].get_varmap())?, 0.0);
    assert_eq!(param_distance(qs[1].get_varmap(), qs_tgt[1].get_varmap())?, 0.0);
    assert_eq!(
        param_distance(agent.actor().get_varmap(), agent.target_actor().get_varmap())?,
        0.0
    );

    let agent = ToyAgent::build(agent_config(8)?)?;
    assert_eq!(agent.critics().len(), 1);
    Ok(())
}

#[test]
fn test_opt_skipped_with_insufficient_data() -> Result<()> {
    let mut agent = ToyAgent::build(agent_config(8)?)?;
    let mut buffer = filled_buffer(7)?;
    assert!(agent.opt(&mut buffer)?.is_none());
    assert_eq!(agent.n_opts(), 0);

    // The buffer itself reports the shortage as an error
    let err = buffer.batch(8).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReachError>(),
        Some(&ReachError::InsufficientData {
            len: 7,
            batch_size: 8
        })
    );
    Ok(())
}

#[test]
fn test_dimension_mismatch() -> Result<()> {
    let mut agent = ToyAgent::build(agent_config(8)?)?;
    let err = agent.sample(&vec![0.0, 0.0, 0.0]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReachError>(),
        Some(ReachError::DimensionMismatch { expected: 2, actual: 3, .. })
    ));

    // Buffer of another dimension
    let config = ReplayBufferConfig::default().capacity(10).dim_obs(3).dim_act(DIM_ACT);
    let mut buffer = ReplayBuffer::build(&config)?;
    for _ in 0..8 {
        buffer.push(Transition::new(vec![0.0; 3], vec![0.0], 0.0, vec![0.0; 3], false, false))?;
    }
    let err = agent.opt(&mut buffer).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ReachError>(),
        Some(ReachError::DimensionMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_actions_within_bounds() -> Result<()> {
    let mut agent = ToyAgent::build(agent_config(8)?.explorer_config(
        reach_candle_agent::explorer::ExplorerConfig::Gaussian {
            initial_ratio: 5.0,
            min_ratio: 5.0,
            decay_steps: 1,
            max_exploration_steps: 0,
        },
    ))?;
    for i in 0..50 {
        let obs = vec![i as f32 / 10.0 - 2.5, 0.3];
        let act = agent.sample(&obs)?;
        assert!((-1.0..=1.0).contains(&act[0]));
    }

    // Greedy actions in evaluation mode
    agent.eval();
    let obs = vec![0.5, 0.5];
    assert_eq!(agent.sample(&obs)?, agent.sample(&obs)?);
    Ok(())
}

#[test]
fn test_save_and_load() -> Result<()> {
    let config = agent_config(8)?.td3(Td3Config::default());
    let mut agent = ToyAgent::build(config.clone())?;
    let mut buffer = filled_buffer(16)?;
    agent.opt(&mut buffer)?;
    agent.opt(&mut buffer)?;

    let dir = TempDir::new("ddpg")?;
    let files = agent.save_params(dir.path())?;
    assert_eq!(files.len(), 6);
    assert!(files.iter().all(|f| f.exists()));

    let mut agent_ = ToyAgent::build(config)?;
    agent_.load_params(dir.path())?;
    assert_eq!(
        param_distance(agent.actor().get_varmap(), agent_.actor().get_varmap())?,
        0.0
    );
    for (q, q_) in agent.target_critics().iter().zip(agent_.target_critics()) {
        assert_eq!(param_distance(q.get_varmap(), q_.get_varmap())?, 0.0);
    }
    Ok(())
}
