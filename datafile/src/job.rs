use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::thread;

use crate::Error;
use crate::Writer;

struct Job {
    path: PathBuf,
    handle: thread::JoinHandle<Result<(), Error>>,
}

/// Outstanding `Writer::finish` calls running in the background.
///
/// Nothing is retried: a failed job leaves the previous file at its path and
/// its error is returned by the next wait. Dropping the registry waits for
/// all jobs.
#[derive(Default)]
pub struct Jobs {
    jobs: Vec<Job>,
}

fn join(job: Job) -> Result<(), Error> {
    let path = job.path;
    match job.handle.join() {
        Ok(result) => result,
        Err(_) => {
            error!("finish job for {} panicked", path.display());
            Err(Error::Io(io::Error::new(io::ErrorKind::Other, "finish job panicked")))
        }
    }
}

impl Jobs {
    pub fn new() -> Jobs {
        Default::default()
    }

    /// Hands `writer` to a background thread that finishes it. Waits for an
    /// earlier job writing to the same path first.
    pub fn submit(&mut self, writer: Writer) -> Result<(), Error> {
        let path = writer.path().to_owned();
        self.wait_for(&path)?;
        let handle = thread::Builder::new()
            .name(format!("finish {}", path.display()))
            .spawn(move || writer.finish())?;
        debug!("submitted finish job for {}", path.display());
        self.jobs.push(Job { path, handle });
        Ok(())
    }

    pub fn num_pending(&self) -> usize {
        self.jobs.iter().filter(|j| !j.handle.is_finished()).count()
    }

    /// Waits for the jobs writing to `path`.
    pub fn wait_for(&mut self, path: &Path) -> Result<(), Error> {
        let (matching, rest) = self.jobs.drain(..).partition(|j| j.path == path);
        self.jobs = rest;
        wait(matching)
    }

    /// Waits for all jobs. Returns the first error, if any.
    pub fn wait_all(&mut self) -> Result<(), Error> {
        wait(self.jobs.drain(..).collect())
    }
}

fn wait(jobs: Vec<Job>) -> Result<(), Error> {
    let mut result = Ok(());
    for job in jobs {
        if let Err(e) = join(job) {
            if result.is_ok() {
                result = Err(e);
            }
        }
    }
    result
}

impl Drop for Jobs {
    fn drop(&mut self) {
        let _ = self.wait_all();
    }
}
