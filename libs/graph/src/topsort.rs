//! Topological ordering of build jobs.

use std::collections::{HashMap, VecDeque};

use quarry_id::JobId;

use crate::error::GraphError;
use crate::types::Job;

/// Orders jobs so that every job appears after all of its deps.
///
/// Kahn's algorithm, deterministic for a given input order: jobs become
/// ready in the order they were declared. Fails on unknown deps and on
/// cycles.
pub fn topsort(jobs: &[Job]) -> Result<Vec<Job>, GraphError> {
    let index: HashMap<JobId, usize> = jobs
        .iter()
        .enumerate()
        .map(|(i, job)| (job.id, i))
        .collect();

    let mut indegree = vec![0usize; jobs.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); jobs.len()];
    for (i, job) in jobs.iter().enumerate() {
        for dep in &job.deps {
            let Some(&d) = index.get(dep) else {
                return Err(GraphError::UnknownDep {
                    job: job.id,
                    dep: *dep,
                });
            };
            indegree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..jobs.len()).filter(|&i| indegree[i] == 0).collect();
    let mut ordered = Vec::with_capacity(jobs.len());

    while let Some(i) = ready.pop_front() {
        ordered.push(jobs[i].clone());
        for &next in &dependents[i] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if ordered.len() != jobs.len() {
        // Any job still carrying an indegree sits on a cycle.
        let stuck = jobs
            .iter()
            .enumerate()
            .find(|(i, _)| indegree[*i] > 0)
            .map(|(_, job)| job.id)
            .unwrap_or_else(|| jobs[0].id);
        return Err(GraphError::Cycle(stuck));
    }

    Ok(ordered)
}
