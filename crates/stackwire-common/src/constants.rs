//! System-wide constants and synthesis defaults.

/// Default address range for a newly defined network.
pub const DEFAULT_VPC_CIDR: &str = "20.0.0.0/16";

/// Number of availability zones a new network spans.
pub const MAX_AZS: usize = 2;

/// Availability zone suffixes, in allocation order.
pub const AZ_SUFFIXES: [char; MAX_AZS] = ['a', 'b'];

/// Prefix length of every generated subnet.
pub const SUBNET_MASK: u8 = 24;

/// NAT gateways per new network.
pub const NAT_GATEWAYS: usize = 1;

/// Service port of the managed cache.
pub const CACHE_PORT: u16 = 6379;

/// Engine of the serverless cache.
pub const CACHE_ENGINE: &str = "redis";

/// Default namespace prefix for resource names.
pub const DEFAULT_NAMESPACE: &str = "api";

/// Default base name for an owned bucket.
pub const DEFAULT_BUCKET_BASE: &str = "output";

/// Default task CPU units.
pub const DEFAULT_CPU: &str = "256";

/// Default task memory in MiB.
pub const DEFAULT_MEMORY_MIB: &str = "512";

/// Default image tag.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Default name of the single container in the task definition.
pub const DEFAULT_CONTAINER_NAME: &str = "app";

/// Preflight cache duration for the bucket CORS rule, in seconds.
pub const CORS_MAX_AGE_SECS: u32 = 3000;

/// Headers the bucket CORS rule exposes to browsers.
pub const CORS_EXPOSED_HEADERS: [&str; 4] = [
    "x-amz-server-side-encryption",
    "x-amz-request-id",
    "x-amz-id-2",
    "ETag",
];

/// Container environment key for the cache host.
pub const ENV_CACHE_HOST: &str = "CACHE_HOST";
/// Container environment key for the cache port.
pub const ENV_CACHE_PORT: &str = "CACHE_PORT";
/// Container environment key for the bucket name.
pub const ENV_BUCKET_NAME: &str = "BUCKET_NAME";

/// Application name used in template descriptions.
pub const APP_NAME: &str = "stackwire";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "stackwire";
