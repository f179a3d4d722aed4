use tokio::sync::OnceCell;

pub(crate) static STORE_SCRIPT_HASH: OnceCell<String> = OnceCell::const_new();
pub(crate) static REMOVE_SCRIPT_HASH: OnceCell<String> = OnceCell::const_new();
pub(crate) static PURGE_SCRIPT_HASH: OnceCell<String> = OnceCell::const_new();

// KEYS[1] session hash, KEYS[2] created_at index
// ARGV[1] session id, ARGV[2] created_at, ARGV[3] payload
pub(crate) static STORE_SCRIPT: &str = r#"
    local key = KEYS[1]
    local index = KEYS[2]
    local id = ARGV[1]
    local created_at = ARGV[2]
    local payload = ARGV[3]

    redis.call('HSET', key, 'created_at', created_at, 'payload', payload)
    redis.call('ZADD', index, created_at, id)

    return 1
"#;

// KEYS[1] session hash, KEYS[2] created_at index
// ARGV[1] session id
pub(crate) static REMOVE_SCRIPT: &str = r#"
    local key = KEYS[1]
    local index = KEYS[2]
    local id = ARGV[1]

    local deleted = redis.call('DEL', key)
    redis.call('ZREM', index, id)

    return deleted
"#;

// KEYS[1] created_at index
// ARGV[1] cutoff (exclusive), ARGV[2] session key prefix
pub(crate) static PURGE_SCRIPT: &str = r#"
    local index = KEYS[1]
    local max = '(' .. ARGV[1]
    local prefix = ARGV[2]

    local ids = redis.call('ZRANGEBYSCORE', index, '-inf', max)
    for _, id in ipairs(ids) do
        redis.call('DEL', prefix .. id)
    end
    redis.call('ZREMRANGEBYSCORE', index, '-inf', max)

    return #ids
"#;
