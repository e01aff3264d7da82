/// Normalised [`Trade`](trade::Trade) model and pagination [`Cursor`](trade::Cursor).
pub mod trade;

/// Time-bucketed [`Cluster`](cluster::Cluster)s of trades and their
/// [`BucketWidth`](cluster::BucketWidth).
pub mod cluster;
