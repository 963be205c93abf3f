use std::sync::Arc;

use anyhow::{bail, Result};

use mirrorscout::{AcceleratedClient, CaptchaOutcome, CaptchaSolver, OcrSolver};

use super::Context;

pub async fn cmd_captcha(ctx: &Context, image_url: &str) -> Result<()> {
    let client = AcceleratedClient::new(ctx.settings.client_options())?;
    let solver = OcrSolver::new(Arc::new(client), ctx.settings.tesseract_path.clone());

    if !solver.check_available().await {
        bail!(
            "tesseract not found at {}",
            ctx.settings.tesseract_path.display()
        );
    }

    match solver.solve(image_url).await {
        CaptchaOutcome::Solved(text) => {
            println!("{text}");
            Ok(())
        }
        CaptchaOutcome::Unsolved => bail!("captcha not solved"),
    }
}
