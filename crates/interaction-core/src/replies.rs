use std::path::Path;

pub const RESTRICTED: &str =
    "❌ This command is restricted to group admins and the bot owner.";

pub const MEDIA_FAILED_NOTICE: &str = "❌ The image could not be loaded.";

#[must_use]
pub fn already(active: bool) -> String {
    let state = if active { "active" } else { "disabled" };
    format!("The bot is already {state} in this chat.")
}

#[must_use]
pub fn toggled(active: bool) -> String {
    let state = if active { "ENABLED" } else { "DISABLED" };
    format!("✅ Bot {state} for this chat!")
}

#[must_use]
pub fn missing_mention(command: &str) -> String {
    format!("In a group you have to mention a user. Example: {command} @someone")
}

#[must_use]
pub fn no_images(directory: &Path) -> String {
    format!(
        "❌ No images available in {}. Add JPG, PNG, GIF, WEBP, MP4 or WEBM files.",
        directory.display()
    )
}

/// `*sender* action *subject*`
#[must_use]
pub fn interaction_line(sender: &str, action: &str, subject: &str) -> String {
    format!("*{sender}* {action} *{subject}*")
}

#[must_use]
pub fn with_media_failure(line: &str) -> String {
    format!("{line}\n\n{MEDIA_FAILED_NOTICE}")
}
