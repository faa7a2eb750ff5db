use rusqlite::{Connection, OptionalExtension};

use crate::types::{MessageId, TextMessage};

const PENDING: i64 = 0;
const IN_FLIGHT: i64 = 1;

/// SQLite backed queues. Every destination shares one table; a message is
/// pending until it is handed to a consumer, then in flight until it is
/// acknowledged (deleted) or released (pending again).
pub struct QueueStore {
    connection: Connection,
}

impl QueueStore {
    pub fn open(path: &str) -> Result<QueueStore, rusqlite::Error> {
        let connection = Connection::open(path)?;
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS message (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                destination TEXT NOT NULL,
                payload TEXT NOT NULL,
                state INTEGER NOT NULL DEFAULT 0,
                delivery_count INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS message_destination ON message (destination, state, id);",
        )?;
        // whatever was in flight when the last process died goes back on the queue
        let recovered = connection.execute(
            "UPDATE message SET state = ?1 WHERE state = ?2",
            (PENDING, IN_FLIGHT),
        )?;
        if recovered > 0 {
            log::info!("recovered {} in-flight messages from {}", recovered, path);
        }
        Ok(QueueStore { connection })
    }

    pub fn in_memory() -> Result<QueueStore, rusqlite::Error> {
        Self::open(":memory:")
    }

    pub fn enqueue(&self, destination: &str, payload: &str) -> Result<MessageId, rusqlite::Error> {
        self.connection.execute(
            "INSERT INTO message (destination, payload, state) VALUES (?1, ?2, ?3)",
            (destination, payload, PENDING),
        )?;
        Ok(self.connection.last_insert_rowid())
    }

    /// Takes the oldest pending message of `destination` and marks it in flight.
    pub fn next_pending(&self, destination: &str) -> Result<Option<TextMessage>, rusqlite::Error> {
        let next = self
            .connection
            .query_row(
                "SELECT id, payload, delivery_count FROM message
                 WHERE destination = ?1 AND state = ?2 ORDER BY id LIMIT 1",
                (destination, PENDING),
                |row| {
                    Ok((
                        row.get::<_, MessageId>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                    ))
                },
            )
            .optional()?;
        let (id, text, delivered) = match next {
            Some(row) => row,
            None => return Ok(None),
        };
        self.connection.execute(
            "UPDATE message SET state = ?1, delivery_count = delivery_count + 1 WHERE id = ?2",
            (IN_FLIGHT, id),
        )?;
        let delivery_count = delivered + 1;
        Ok(Some(TextMessage {
            id,
            destination: destination.to_owned(),
            text,
            delivery_count,
            redelivered: delivery_count > 1,
        }))
    }

    /// Returns false when the message was not in flight (unknown or already acknowledged).
    pub fn acknowledge(&self, id: MessageId) -> Result<bool, rusqlite::Error> {
        let deleted = self.connection.execute(
            "DELETE FROM message WHERE id = ?1 AND state = ?2",
            (id, IN_FLIGHT),
        )?;
        Ok(deleted == 1)
    }

    /// Puts an in-flight message back on its queue and reports how often it was
    /// delivered so far. `None` if the message is no longer in flight.
    pub fn release(&self, id: MessageId) -> Result<Option<u32>, rusqlite::Error> {
        let delivery_count = self
            .connection
            .query_row(
                "SELECT delivery_count FROM message WHERE id = ?1 AND state = ?2",
                (id, IN_FLIGHT),
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        if delivery_count.is_some() {
            self.connection.execute(
                "UPDATE message SET state = ?1 WHERE id = ?2",
                (PENDING, id),
            )?;
        }
        Ok(delivery_count)
    }

    /// Undoes a handoff that never reached a consumer: the message goes back to
    /// pending without counting as a delivery.
    pub fn requeue(&self, id: MessageId) -> Result<bool, rusqlite::Error> {
        let requeued = self.connection.execute(
            "UPDATE message SET state = ?1, delivery_count = MAX(delivery_count - 1, 0)
             WHERE id = ?2 AND state = ?3",
            (PENDING, id, IN_FLIGHT),
        )?;
        Ok(requeued == 1)
    }

    /// Moves a message to another destination as a fresh, undelivered message.
    pub fn move_to(&self, id: MessageId, destination: &str) -> Result<bool, rusqlite::Error> {
        let moved = self.connection.execute(
            "UPDATE message SET destination = ?1, state = ?2, delivery_count = 0 WHERE id = ?3",
            (destination, PENDING, id),
        )?;
        Ok(moved == 1)
    }

    /// Messages still held for `destination`, in flight ones included, oldest first.
    pub fn browse(&self, destination: &str) -> Result<Vec<TextMessage>, rusqlite::Error> {
        let mut result = vec![];
        let mut sql = self.connection.prepare(
            "SELECT id, payload, delivery_count FROM message WHERE destination = ?1 ORDER BY id",
        )?;
        let rows = sql.query_map([destination], |row| {
            let delivery_count: u32 = row.get(2)?;
            Ok(TextMessage {
                id: row.get(0)?,
                destination: destination.to_owned(),
                text: row.get(1)?,
                delivery_count,
                redelivered: delivery_count > 1,
            })
        })?;
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEUE: &str = "DEV.QUEUE.1";

    #[test]
    fn delivers_in_fifo_order_per_destination() {
        let store = QueueStore::in_memory().unwrap();
        let first = store.enqueue(QUEUE, "one").unwrap();
        store.enqueue("OTHER", "elsewhere").unwrap();
        let second = store.enqueue(QUEUE, "two").unwrap();

        let message = store.next_pending(QUEUE).unwrap().unwrap();
        assert_eq!(message.id, first);
        assert_eq!(message.text, "one");
        assert_eq!(message.delivery_count, 1);
        assert!(!message.redelivered);

        assert_eq!(store.next_pending(QUEUE).unwrap().unwrap().id, second);
        assert!(store.next_pending(QUEUE).unwrap().is_none());
    }

    #[test]
    fn acknowledge_removes_only_in_flight_messages() {
        let store = QueueStore::in_memory().unwrap();
        let id = store.enqueue(QUEUE, "one").unwrap();
        assert!(!store.acknowledge(id).unwrap());

        store.next_pending(QUEUE).unwrap();
        assert!(store.acknowledge(id).unwrap());
        assert!(!store.acknowledge(id).unwrap());
        assert!(store.browse(QUEUE).unwrap().is_empty());
    }

    #[test]
    fn released_message_is_redelivered() {
        let store = QueueStore::in_memory().unwrap();
        let id = store.enqueue(QUEUE, "one").unwrap();
        store.next_pending(QUEUE).unwrap();

        assert_eq!(store.release(id).unwrap(), Some(1));
        let again = store.next_pending(QUEUE).unwrap().unwrap();
        assert_eq!(again.id, id);
        assert_eq!(again.delivery_count, 2);
        assert!(again.redelivered);
    }

    #[test]
    fn release_after_acknowledge_is_a_no_op() {
        let store = QueueStore::in_memory().unwrap();
        let id = store.enqueue(QUEUE, "one").unwrap();
        store.next_pending(QUEUE).unwrap();
        store.acknowledge(id).unwrap();
        assert_eq!(store.release(id).unwrap(), None);
        assert!(store.next_pending(QUEUE).unwrap().is_none());
    }

    #[test]
    fn requeue_does_not_count_as_a_delivery() {
        let store = QueueStore::in_memory().unwrap();
        let id = store.enqueue(QUEUE, "one").unwrap();
        store.next_pending(QUEUE).unwrap();

        assert!(store.requeue(id).unwrap());
        assert!(!store.requeue(id).unwrap());
        let again = store.next_pending(QUEUE).unwrap().unwrap();
        assert_eq!(again.id, id);
        assert_eq!(again.delivery_count, 1);
        assert!(!again.redelivered);
    }

    #[test]
    fn move_to_resets_delivery_count() {
        let store = QueueStore::in_memory().unwrap();
        let id = store.enqueue(QUEUE, "one").unwrap();
        store.next_pending(QUEUE).unwrap();
        store.release(id).unwrap();

        assert!(store.move_to(id, "DEV.QUEUE.1.BACKOUT").unwrap());
        assert!(store.browse(QUEUE).unwrap().is_empty());
        let moved = store.browse("DEV.QUEUE.1.BACKOUT").unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].delivery_count, 0);
    }

    #[test]
    fn reopening_a_file_recovers_in_flight_messages() {
        let path = std::env::temp_dir().join(format!("mqdemo-store-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let path_str = path.to_str().unwrap();
        {
            let store = QueueStore::open(path_str).unwrap();
            store.enqueue(QUEUE, "one").unwrap();
            store.next_pending(QUEUE).unwrap().unwrap();
            assert!(store.next_pending(QUEUE).unwrap().is_none());
        }
        let store = QueueStore::open(path_str).unwrap();
        let message = store.next_pending(QUEUE).unwrap().unwrap();
        assert_eq!(message.text, "one");
        assert!(message.redelivered);
        drop(store);
        let _ = std::fs::remove_file(&path);
    }
}
