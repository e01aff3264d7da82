use chrono::{DateTime, Utc};

/// Stateful [`ClusterAggregator`](cluster::ClusterAggregator) that groups ordered trade pages
/// into time-bucketed [`Cluster`](crate::subscription::cluster::Cluster)s.
pub mod cluster;

/// Source of wall-clock time used to decide when a trade stream has caught up to the present.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C> Clock for &C
where
    C: Clock + ?Sized,
{
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// [`Clock`] frozen at a fixed instant.
#[derive(Debug, Copy, Clone)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
