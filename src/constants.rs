//! Constants used throughout the application.
//!
//! This module contains all constants used in the daybook application,
//! organized into logical groups. Having constants centralized makes them
//! easier to find, modify, and reference consistently.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "daybook";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "A journal kept as per-date calendar files";

// Configuration Keys & Environment Variables
/// Environment variable for specifying the daybook data directory.
pub const ENV_VAR_DAYBOOK_DIR: &str = "DAYBOOK_DIR";
/// Environment variable supplying the passphrase non-interactively.
pub const ENV_VAR_DAYBOOK_PASSPHRASE: &str = "DAYBOOK_PASSPHRASE";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";
/// Default sub-directory name for entry files within the user's home directory.
pub const DEFAULT_DATA_SUBDIR: &str = "Documents/daybook";

// File System Parameters
/// File extension for plaintext entry files.
pub const ENTRY_FILE_EXTENSION: &str = ".ics";
/// Suffix appended to the canonical name for encrypted entry files.
pub const ENCRYPTED_FILE_SUFFIX: &str = ".enc";
/// Fixed name of the file holding the encrypted system key.
pub const SYSTEM_KEY_FILE_NAME: &str = "security.dat";
/// Fixed name of the file holding the user passphrase digest.
pub const PASSPHRASE_DIGEST_FILE_NAME: &str = "userpassword.dat";
/// Name of the advisory lock file guarding a data directory.
pub const LOCK_FILE_NAME: &str = ".daybook.lock";

// Security
/// The sentinel passphrase in effect until the user picks their own.
///
/// The literal is kept from the original data-directory format so existing
/// stores unlock without migration.
pub const DEFAULT_PASSPHRASE: &str = "No user-supplied password yet";

// Date/Time Formats
/// Date format string for ISO date input (YYYY-MM-DD).
pub const DATE_FORMAT_ISO: &str = "%Y-%m-%d";
/// Date format string for compact dates and canonical file names (YYYYMMDD).
pub const DATE_FORMAT_COMPACT: &str = "%Y%m%d";
/// Local date-time format used for calendar DATE-TIME values.
pub const DATETIME_FORMAT_COMPACT: &str = "%Y%m%dT%H%M%S";
/// UTC timestamp format used for LAST-MODIFIED and CREATED values.
pub const TIMESTAMP_FORMAT_UTC: &str = "%Y%m%dT%H%M%SZ";

// Calendar Format Parameters
/// PRODID emitted in generated calendar files.
pub const CALENDAR_PROD_ID: &str = "-//daybook//EN";
/// Maximum content-line length in octets before folding.
pub const FOLD_WIDTH: usize = 75;
