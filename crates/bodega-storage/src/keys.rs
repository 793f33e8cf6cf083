//! Storage key constants.

/// Storage keys used by the session engine.
///
/// The literal key strings match the persisted layout already in the field;
/// changing them would orphan existing installs.
pub struct StorageKeys;

impl StorageKeys {
    /// Short-lived access token
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Long-lived refresh token
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Cached user profile (JSON)
    pub const USER_DATA: &'static str = "userData";

    /// First-run flag (boolean string)
    pub const IS_FIRST_TIME_USER: &'static str = "isFirstTimeUser";

    /// Expo push notification token for this device
    pub const EXPO_PUSH_TOKEN: &'static str = "expoPushToken";

    /// Locally generated installation identifier
    pub const DEVICE_INSTALLATION_ID: &'static str = "device_installation_id";
}
