//! Types describing a resolved backup job: everything the engine needs
//! to know about a (host, directory) pair before it runs.

use std::path::PathBuf;

use crate::config::ConfigTree;
use crate::error::{Result, SnapbackError};

/// A ring-size quadruple. `hourlies >= 1` is enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub hourlies: u32,
    pub dailies: u32,
    pub weeklies: u32,
    pub monthlies: u32,
}

impl RetentionPolicy {
    #[must_use]
    pub fn count(self, tier: Tier) -> u32 {
        match tier {
            Tier::Hourly => self.hourlies,
            Tier::Daily => self.dailies,
            Tier::Weekly => self.weeklies,
            Tier::Monthly => self.monthlies,
        }
    }
}

/// One of the four retention classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Tier {
    /// Whether a full rotation (including slot 0) applies to this tier,
    /// as opposed to the hourly tier's slot-0-preserved rotation.
    #[must_use]
    pub fn rotates_all(self) -> bool {
        !matches!(self, Tier::Hourly)
    }
}

/// Either a single fixed destination or a list to select from by LRU.
#[derive(Debug, Clone)]
pub enum DestinationPolicy {
    Fixed(PathBuf),
    Lru(Vec<PathBuf>),
}

/// A backup job resolved from configuration, ready to run.
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub host: String,
    pub remote_directory: String,
    pub excludes: Vec<String>,
    pub retention: RetentionPolicy,
    pub destination: DestinationPolicy,
    pub auto_time: bool,
    pub literal_directory: bool,
    pub create_dir: bool,
    pub hourly_dir: String,
    pub daily_dir: String,
    pub weekly_dir: String,
    pub monthly_dir: String,
    pub must_exceed_seconds: u64,
    pub rsync: String,
    pub rsync_opts: Vec<String>,
    /// `Cp` directive, tokenized: program followed by its fixed flags.
    /// Source and destination paths are appended at invocation time.
    /// Defaults to `["cp", "-al"]` (spec.md §6 hard-link clone contract).
    pub cp_command: Vec<String>,
    /// `Mv` directive, tokenized the same way as `cp_command`. Defaults
    /// to `["mv"]`; used by the Ring Rotator to shift slots.
    pub mv_command: Vec<String>,
    /// `Rm` directive, tokenized the same way as `cp_command`. Defaults
    /// to `["rm", "-rf"]`; used by the Ring Rotator to drop the oldest
    /// slot.
    pub rm_command: Vec<String>,
}

impl BackupJob {
    /// The source spec passed to the external sync tool: `host:dir` with
    /// a trailing slash appended unless `literal_directory` is set.
    #[must_use]
    pub fn sync_source(&self) -> String {
        if self.literal_directory || self.remote_directory.ends_with('/') {
            format!("{}:{}", self.host, self.remote_directory)
        } else {
            format!("{}:{}/", self.host, self.remote_directory)
        }
    }

    #[must_use]
    pub fn tier_dir_name(&self, tier: Tier) -> &str {
        match tier {
            Tier::Hourly => &self.hourly_dir,
            Tier::Daily => &self.daily_dir,
            Tier::Weekly => &self.weekly_dir,
            Tier::Monthly => &self.monthly_dir,
        }
    }

    /// Resolve every (host, directory) job declared in `tree`, honoring
    /// the engine CLI's `-p`/`-P` host/directory regex restrictions.
    ///
    /// # Errors
    ///
    /// Returns a config-fatal error (spec.md §7) if any selected job
    /// declares `Hourlies < 1`, or if a typed key is malformed.
    pub fn resolve_all(
        tree: &ConfigTree,
        host_filter: Option<&regex::Regex>,
        dir_filter: Option<&regex::Regex>,
    ) -> Result<Vec<Self>> {
        let mut jobs = Vec::new();
        for host in tree.host_names() {
            if host_filter.is_some_and(|re| !re.is_match(host)) {
                continue;
            }
            for dir in tree.directories_for(host) {
                if dir_filter.is_some_and(|re| !re.is_match(&dir)) {
                    continue;
                }
                jobs.push(Self::resolve(tree, host, &dir)?);
            }
        }
        Ok(jobs)
    }

    fn resolve(tree: &ConfigTree, host: &str, dir: &str) -> Result<Self> {
        let scope = tree.scope(Some(host), Some(dir));

        let hourlies = scope.get_uint("hourlies", 0)?;
        if hourlies < 1 {
            return Err(SnapbackError::InvalidRetention {
                host: host.to_string(),
                directory: dir.to_string(),
            });
        }
        let retention = RetentionPolicy {
            hourlies,
            dailies: scope.get_uint("dailies", 0)?,
            weeklies: scope.get_uint("weeklies", 0)?,
            monthlies: scope.get_uint("monthlies", 0)?,
        };

        let destination = match scope.get_list_innermost("destinationlist") {
            Some(list) if !list.is_empty() && !list[0].eq_ignore_ascii_case("none") => {
                DestinationPolicy::Lru(list.into_iter().map(PathBuf::from).collect())
            }
            _ => DestinationPolicy::Fixed(
                scope.get_string("destination").map(PathBuf::from).unwrap_or_default(),
            ),
        };

        let rsync_opts = scope.get_list_innermost("rsyncopts").unwrap_or_else(|| {
            vec!["-avz".to_string(), "-e".to_string(), "ssh".to_string()]
        });
        let cp_command = scope
            .get_list_innermost("cp")
            .unwrap_or_else(|| vec!["cp".to_string(), "-al".to_string()]);
        let mv_command = scope
            .get_list_innermost("mv")
            .unwrap_or_else(|| vec!["mv".to_string()]);
        let rm_command = scope
            .get_list_innermost("rm")
            .unwrap_or_else(|| vec!["rm".to_string(), "-rf".to_string()]);

        Ok(Self {
            host: scope.get_string("backuphost").unwrap_or(host).to_string(),
            remote_directory: dir.to_string(),
            excludes: scope.get_list("exclude"),
            retention,
            destination,
            auto_time: scope.get_bool("autotime", true),
            literal_directory: scope.get_bool("literaldirectory", false),
            create_dir: scope.get_bool("createdir", true),
            hourly_dir: scope.get_string("hourlydir").unwrap_or("hourly").to_string(),
            daily_dir: scope.get_string("dailydir").unwrap_or("daily").to_string(),
            weekly_dir: scope.get_string("weeklydir").unwrap_or("weekly").to_string(),
            monthly_dir: scope
                .get_string("monthlydir")
                .unwrap_or("monthly")
                .to_string(),
            must_exceed_seconds: scope.get_duration("mustexceed", 300)?,
            rsync: scope.get_string("rsync").unwrap_or("rsync").to_string(),
            rsync_opts,
            cp_command,
            mv_command,
            rm_command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn tree(doc: &str) -> ConfigTree {
        ConfigTree::parse(Path::new("t.conf"), doc).unwrap()
    }

    #[test]
    fn resolves_defaults() {
        let t = tree(
            "\
<Backup h1>
    <BackupDirectory /var/www>
        Hourlies 4
    </BackupDirectory>
</Backup>
",
        );
        let jobs = BackupJob::resolve_all(&t, None, None).unwrap();
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.host, "h1");
        assert_eq!(job.remote_directory, "/var/www");
        assert_eq!(job.retention.hourlies, 4);
        assert_eq!(job.hourly_dir, "hourly");
        assert_eq!(job.rsync, "rsync");
        assert_eq!(job.rsync_opts, vec!["-avz", "-e", "ssh"]);
        assert_eq!(job.cp_command, vec!["cp", "-al"]);
        assert_eq!(job.mv_command, vec!["mv"]);
        assert_eq!(job.rm_command, vec!["rm", "-rf"]);
        assert!(matches!(job.destination, DestinationPolicy::Fixed(ref p) if p.as_os_str().is_empty()));
    }

    #[test]
    fn rejects_zero_hourlies() {
        let t = tree(
            "\
<Backup h1>
    <BackupDirectory /var/www>
        Hourlies 0
    </BackupDirectory>
</Backup>
",
        );
        let err = BackupJob::resolve_all(&t, None, None).unwrap_err();
        assert!(matches!(err, SnapbackError::InvalidRetention { .. }));
    }

    #[test]
    fn destination_list_wins_unless_none() {
        let t = tree(
            "\
<Backup h1>
    <BackupDirectory /d>
        Hourlies 1
        DestinationList /a /b
    </BackupDirectory>
</Backup>
",
        );
        let jobs = BackupJob::resolve_all(&t, None, None).unwrap();
        match &jobs[0].destination {
            DestinationPolicy::Lru(paths) => {
                assert_eq!(paths, &[PathBuf::from("/a"), PathBuf::from("/b")]);
            }
            DestinationPolicy::Fixed(_) => panic!("expected Lru destination"),
        }
    }

    #[test]
    fn destination_list_none_falls_back_to_fixed() {
        let t = tree(
            "\
<Backup h1>
    <BackupDirectory /d>
        Hourlies 1
        DestinationList none
        Destination /backup
    </BackupDirectory>
</Backup>
",
        );
        let jobs = BackupJob::resolve_all(&t, None, None).unwrap();
        assert!(matches!(
            &jobs[0].destination,
            DestinationPolicy::Fixed(p) if p == &PathBuf::from("/backup")
        ));
    }

    #[test]
    fn host_filter_restricts_jobs() {
        let t = tree(
            "\
<Backup h1>
    <BackupDirectory /d>
        Hourlies 1
    </BackupDirectory>
</Backup>
<Backup h2>
    <BackupDirectory /d>
        Hourlies 1
    </BackupDirectory>
</Backup>
",
        );
        let re = regex::Regex::new("^h2$").unwrap();
        let jobs = BackupJob::resolve_all(&t, Some(&re), None).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].host, "h2");
    }

    #[test]
    fn sync_source_appends_slash_unless_literal() {
        let t = tree(
            "\
<Backup h1>
    <BackupDirectory /home/mike>
        Hourlies 1
    </BackupDirectory>
</Backup>
",
        );
        let jobs = BackupJob::resolve_all(&t, None, None).unwrap();
        assert_eq!(jobs[0].sync_source(), "h1:/home/mike/");
    }

    #[test]
    fn literal_directory_suppresses_trailing_slash() {
        let t = tree(
            "\
<Backup h1>
    <BackupDirectory /home/mike>
        Hourlies 1
        LiteralDirectory yes
    </BackupDirectory>
</Backup>
",
        );
        let jobs = BackupJob::resolve_all(&t, None, None).unwrap();
        assert_eq!(jobs[0].sync_source(), "h1:/home/mike");
    }
}
