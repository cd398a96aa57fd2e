//! Plain-text table rendering for jobs and nodes, styled the way the rest of
//! this codebase's CLIs use `console::style` for status coloring.

use console::style;
use fleet_proto::{Job, JobStatus, Node, NodeStatus};

pub fn job_row(job: &Job) -> String {
    format!(
        "{:<8} {:<36} {:<10} {:<8} {:<8} {:>3}% {}",
        job.sequence_number,
        job.id,
        status_styled(job.status),
        job.engine.as_str(),
        job.priority.as_str(),
        job.progress,
        job.scenario,
    )
}

pub fn job_table(jobs: &[Job]) {
    println!(
        "{:<8} {:<36} {:<10} {:<8} {:<8} {:>4} {}",
        "SEQ", "ID", "STATUS", "ENGINE", "PRIORITY", "PROG", "SCENARIO"
    );
    for job in jobs {
        println!("{}", job_row(job));
    }
}

pub fn job_detail(job: &Job) {
    println!("id:              {}", job.id);
    println!("sequence:        {}", job.sequence_number);
    println!("scenario:        {}", job.scenario);
    println!("engine:          {}", job.engine.as_str());
    println!("queue:           {}", job.queue.as_str());
    println!("priority:        {}", job.priority.as_str());
    println!("status:          {}", status_styled(job.status));
    println!("progress:        {}%", job.progress);
    println!("node_id:         {}", job.node_id.map(|n| n.to_string()).unwrap_or_else(|| "-".into()));
    println!("retry_count:     {}/{}", job.retry_count, job.max_retries);
    if let Some(err) = &job.error {
        println!("error:           {err}");
    }
    if let Some(reason) = &job.failure_reason {
        println!("failure_reason:  {reason:?}");
    }
    println!("created_at:      {}", job.created_at);
    if let Some(started) = job.started_at {
        println!("started_at:      {started}");
    }
    if let Some(completed) = job.completed_at {
        println!("completed_at:    {completed}");
    }
    if !job.state_transitions.is_empty() {
        println!("transitions:");
        for t in &job.state_transitions {
            println!("  {} -> {} at {}{}", t.from, t.to, t.timestamp, t.reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default());
        }
    }
}

pub fn node_table(nodes: &[Node]) {
    println!(
        "{:<36} {:<16} {:<9} {:<8} {:<6} {}",
        "ID", "NAME", "STATUS", "TYPE", "GPU", "CURRENT_JOB"
    );
    for node in nodes {
        println!(
            "{:<36} {:<16} {:<9} {:<8} {:<6} {}",
            node.id,
            node.name,
            node_status_styled(node.status),
            node.node_type.as_str(),
            if node.has_gpu { "yes" } else { "no" },
            node.current_job_id.map(|j| j.to_string()).unwrap_or_else(|| "-".into()),
        );
    }
}

fn status_styled(status: JobStatus) -> String {
    let s = status.as_str();
    match status {
        JobStatus::Completed => style(s).green().to_string(),
        JobStatus::Failed | JobStatus::Rejected | JobStatus::TimedOut => style(s).red().to_string(),
        JobStatus::Running | JobStatus::Assigned => style(s).cyan().to_string(),
        JobStatus::Canceled | JobStatus::Paused => style(s).yellow().to_string(),
        _ => s.to_string(),
    }
}

fn node_status_styled(status: NodeStatus) -> String {
    let s = status.as_str();
    match status {
        NodeStatus::Available => style(s).green().to_string(),
        NodeStatus::Busy => style(s).cyan().to_string(),
        NodeStatus::Offline => style(s).red().to_string(),
    }
}
