//! Host-side composition.
//!
//! One composition runs per UI-ready signal: a single helper call plus a
//! single store read, joined into the display string that gets pushed to the
//! originating window.

/// The call name the helper answers.
pub const GREETING_CALL: &str = "greeting";

/// The argument sent with the greeting call.
pub const GREETING_TARGET: &str = "World";

/// Join the helper's greeting with the stored names.
///
/// With no names, the greeting stands alone. Seeding guarantees the store is
/// never empty in the shipped flow.
pub fn compose_greeting(greeting: &str, names: &[String]) -> String {
    if names.is_empty() {
        format!("{greeting}!")
    } else {
        format!("{greeting} from {}!", names.join(", "))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::HelperConnection;
    use crate::helper;
    use crate::store::NameStore;

    #[test]
    fn test_compose_with_names() {
        let names = vec![
            "Joey".to_string(),
            "Sally".to_string(),
            "Junior".to_string(),
        ];
        assert_eq!(
            compose_greeting("Hello World", &names),
            "Hello World from Joey, Sally, Junior!"
        );
    }

    #[test]
    fn test_compose_without_names() {
        assert_eq!(compose_greeting("Hello World", &[]), "Hello World!");
    }

    /// The full host-side flow: a live serve loop over an in-memory channel,
    /// a freshly seeded store, and the composition joining the two.
    #[tokio::test]
    async fn test_ready_to_greeting_end_to_end() {
        let (near, far) = tokio::io::duplex(4096);
        let (far_read, far_write) = tokio::io::split(far);
        tokio::spawn(helper::serve(far_read, far_write));

        let (near_read, near_write) = tokio::io::split(near);
        let conn = HelperConnection::from_io(near_read, near_write, None);
        let store = NameStore::open(":memory:").unwrap();

        let greeting = conn.call(GREETING_CALL, GREETING_TARGET).await.unwrap();
        let names = store.select_names().unwrap();

        assert_eq!(
            compose_greeting(&greeting, &names),
            "Hello World from Joey, Sally, Junior!"
        );
    }
}
