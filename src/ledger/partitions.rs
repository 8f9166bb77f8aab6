/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `tasks`: task:{task_no} -> Task (JSON)
/// - `provider_jobs`: job:{provider_job_id} -> task_no (string)
/// - `credits`: credit:{user_id} -> CreditAccount (JSON)

pub const TASKS_PARTITION: &str = "tasks";
pub const PROVIDER_JOBS_PARTITION: &str = "provider_jobs";
pub const CREDITS_PARTITION: &str = "credits";

/// Encode a task key: task:{task_no}
pub fn encode_task_key(task_no: &str) -> Vec<u8> {
    format!("task:{}", task_no).into_bytes()
}

/// Encode a provider job key: job:{provider_job_id}
pub fn encode_job_key(job_id: &str) -> Vec<u8> {
    format!("job:{}", job_id).into_bytes()
}

/// Encode a credit account key: credit:{user_id}
pub fn encode_credit_key(user_id: &str) -> Vec<u8> {
    format!("credit:{}", user_id).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_key_encoding() {
        let key = encode_task_key("0192d5e8-aaaa");
        assert_eq!(key, b"task:0192d5e8-aaaa");
    }

    #[test]
    fn test_job_key_encoding() {
        let key = encode_job_key("kie-123");
        assert_eq!(key, b"job:kie-123");
    }

    #[test]
    fn test_credit_key_encoding() {
        let key = encode_credit_key("user_42");
        assert_eq!(key, b"credit:user_42");
    }
}
