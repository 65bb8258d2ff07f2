pub fn render_password_reset(name: &str, reset_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Reset your password</h2>
    <p>Hi {name},</p>
    <p>We received a request to reset the password for your Campestre Dogs account.</p>
    <p><a href="{reset_url}" style="display: inline-block; padding: 10px 20px; background: #047857; color: white; text-decoration: none; border-radius: 4px;">Reset Password</a></p>
    <p>Or copy and paste this link into your browser:</p>
    <p style="word-break: break-all; color: #3b82f6;">{reset_url}</p>
    <p style="color: #666; font-size: 14px;">This link expires in 1 hour. If you didn't request a reset, you can safely ignore this email.</p>
</body>
</html>"#
    )
}
