use super::OutgoingEmail;
use crate::users::UserRecord;

pub fn registration(user: &UserRecord, link: &str) -> OutgoingEmail {
    let body = format!(
        "Hi {},\n\
        \n\
        Welcome to Ryder App! We're excited to have you on board.\n\
        \n\
        Thank you for registering. Please use the following link to complete your registration:\n\
        \n\
        {}\n\
        \n\
        If you have any questions or need assistance, feel free to contact our support team.\n\
        \n\
        Best regards,\n\
        The Ryder Team.",
        user.display_name(),
        link
    );
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Get started with the Ryder App - Confirm your email".into(),
        body,
    }
}

pub fn password_reset(user: &UserRecord, link: &str) -> OutgoingEmail {
    let body = format!(
        "Hi, {},\n\
        \n\
        Please use the following link to reset your password:\n\
        \n\
        {}\n\
        \n\
        The link expires in 24 hours. If you did not request a reset, you can ignore this email.",
        user.display_name(),
        link
    );
    OutgoingEmail {
        to: user.email.clone(),
        subject: "Reset your password".into(),
        body,
    }
}
