//! Background job tracking for pipesh
//!
//! Each background group becomes one job holding the children it spawned.
//! `reap` polls them without blocking, so finished processes never linger
//! as zombies and the shell can announce them before the next prompt.

use crate::pipeline::Status;
use std::fmt;
use std::process::Child;

#[derive(Debug)]
pub struct Job {
    pub id: usize,
    /// Pid of the group's last spawned stage
    pub pid: u32,
    pub command: String,
    children: Vec<Child>,
    statuses: Vec<Option<Status>>,
}

impl Job {
    /// Poll every child that has not exited yet
    fn poll(&mut self) {
        for (child, status) in self.children.iter_mut().zip(self.statuses.iter_mut()) {
            if status.is_some() {
                continue;
            }
            match child.try_wait() {
                Ok(Some(exit)) => {
                    log::debug!("job {}: pid {} exited with {}", self.id, child.id(), exit);
                    *status = Some(Status::from_exit(exit));
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("job {}: cannot poll pid {}: {}", self.id, child.id(), e);
                    *status = Some(Status::Exited(-1));
                }
            }
        }
    }

    fn is_done(&self) -> bool {
        self.statuses.iter().all(Option::is_some)
    }

    /// The status of the last child, once every child has exited
    fn status(&self) -> Option<Status> {
        if self.is_done() {
            self.statuses.last().copied().flatten()
        } else {
            None
        }
    }
}

/// A job whose processes have all exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub id: usize,
    pub pid: u32,
    pub command: String,
    pub status: Status,
}

impl fmt::Display for Finished {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status.code() {
            0 => write!(f, "[{}]+ Done  {}", self.id, self.command),
            code => write!(f, "[{}]+ Exit {}  {}", self.id, code, self.command),
        }
    }
}

#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        JobTable {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Register a freshly spawned group and return its job id and pid
    pub fn launch(&mut self, command: String, children: Vec<Child>) -> (usize, u32) {
        if self.jobs.is_empty() {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;

        let pid = children.last().map_or(0, Child::id);
        let statuses = vec![None; children.len()];
        self.jobs.push(Job {
            id,
            pid,
            command,
            children,
            statuses,
        });
        (id, pid)
    }

    /// Remove and return every job whose processes have all exited
    pub fn reap(&mut self) -> Vec<Finished> {
        let mut finished = Vec::new();
        self.jobs.retain_mut(|job| {
            job.poll();
            match job.status() {
                Some(status) => {
                    log::info!("job {} finished: {:?}", job.id, status);
                    finished.push(Finished {
                        id: job.id,
                        pid: job.pid,
                        command: std::mem::take(&mut job.command),
                        status,
                    });
                    false
                }
                None => true,
            }
        });
        finished
    }

    /// Jobs still running, oldest first
    pub fn running(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::{Duration, Instant};

    fn spawn(program: &str, args: &[&str]) -> Child {
        Command::new(program).args(args).spawn().unwrap()
    }

    fn reap_until_empty(table: &mut JobTable) -> Vec<Finished> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut finished = Vec::new();
        while !table.is_empty() && Instant::now() < deadline {
            finished.extend(table.reap());
            std::thread::sleep(Duration::from_millis(10));
        }
        finished
    }

    #[test]
    fn ids_increment_while_jobs_run() {
        let mut table = JobTable::new();
        let (a, _) = table.launch("sleep 1".into(), vec![spawn("sleep", &["1"])]);
        let (b, _) = table.launch("true".into(), vec![spawn("true", &[])]);
        assert_eq!((a, b), (1, 2));
        assert_eq!(table.running().count(), 2);
        reap_until_empty(&mut table);
    }

    #[test]
    fn ids_restart_when_table_empties() {
        let mut table = JobTable::new();
        table.launch("true".into(), vec![spawn("true", &[])]);
        reap_until_empty(&mut table);
        let (id, _) = table.launch("true".into(), vec![spawn("true", &[])]);
        assert_eq!(id, 1);
        reap_until_empty(&mut table);
    }

    #[test]
    fn pid_is_last_child() {
        let mut table = JobTable::new();
        let first = spawn("true", &[]);
        let last = spawn("true", &[]);
        let expected = last.id();
        let (_, pid) = table.launch("true | true".into(), vec![first, last]);
        assert_eq!(pid, expected);
        reap_until_empty(&mut table);
    }

    #[test]
    fn reap_reports_last_child_status() {
        let mut table = JobTable::new();
        table.launch(
            "true | false".into(),
            vec![spawn("true", &[]), spawn("false", &[])],
        );
        let finished = reap_until_empty(&mut table);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status, Status::Exited(1));
        assert_eq!(finished[0].to_string(), "[1]+ Exit 1  true | false");
    }

    #[test]
    fn job_waits_for_every_child() {
        let mut table = JobTable::new();
        table.launch(
            "sleep 1 | true".into(),
            vec![spawn("sleep", &["1"]), spawn("true", &[])],
        );
        std::thread::sleep(Duration::from_millis(200));
        assert!(table.reap().is_empty());
        assert_eq!(table.len(), 1);

        let finished = reap_until_empty(&mut table);
        assert_eq!(finished[0].to_string(), "[1]+ Done  sleep 1 | true");
    }
}
