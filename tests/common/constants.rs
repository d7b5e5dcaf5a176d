// Test configuration constants

// Archive request used across tests
pub const SOURCE_TABLE: &str = "orders";
pub const TARGET_TABLE: &str = "orders_backup";
pub const DATE_CONDITION: &str = "20200101";

// Error raised by the fake session
pub const EXECUTION_ERROR: &str = "Lock request time out period exceeded.";

pub const CLOSE_MESSAGE: &str = "Connection Closed Successfully!!!";
