//! Registration screen shown until the server has content for this device.
//!
//! Drawn with `embedded-graphics` straight into a [`MonoImage`], so it goes
//! through the same display path as downloaded content.

use crate::identity::DeviceIdentity;
use crate::image::MonoImage;
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_8X13, FONT_9X15},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

pub const URL_WIKI: &str = "https://wiki.zivyobraz.eu";

const HEADER_HEIGHT: u32 = 70;
const FOOTER_HEIGHT: u32 = 40;
const LEFT_MARGIN: i32 = 50;

const MAC_LABEL: &str = "MAC Address (use for registration):";
const HOSTNAME_LABEL: &str = "Device Hostname:";

const INSTRUCTIONS: [&str; 5] = [
    "1. Go to https://zivyobraz.eu",
    "2. Create an account or log in",
    "3. Register this device using the MAC address above",
    "4. Configure your display content",
    "5. The display will update automatically",
];

fn draw<D: Drawable<Color = BinaryColor>>(item: D, target: &mut MonoImage) {
    if let Err(never) = item.draw(target) {
        match never {}
    }
}

/// Render the registration screen for `identity` at `width` x `height`.
pub fn render(identity: &DeviceIdentity, width: u32, height: u32) -> MonoImage {
    let mut image = MonoImage::new(width, height);
    let center_x = (width / 2) as i32;

    let black_style = PrimitiveStyle::with_fill(BinaryColor::On);
    let centered = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();

    // Header bar
    draw(
        Rectangle::new(Point::zero(), Size::new(width, HEADER_HEIGHT)).into_styled(black_style),
        &mut image,
    );
    draw(
        Text::with_text_style(
            "Device Not Registered",
            Point::new(center_x, 12),
            MonoTextStyle::new(&FONT_10X20, BinaryColor::Off),
            centered,
        ),
        &mut image,
    );
    draw(
        Text::with_text_style(
            "Register at zivyobraz.eu to display content",
            Point::new(center_x, 42),
            MonoTextStyle::new(&FONT_9X15, BinaryColor::Off),
            centered,
        ),
        &mut image,
    );

    let label = MonoTextStyle::new(&FONT_9X15, BinaryColor::On);
    let value = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
    let fields = [
        (MAC_LABEL, identity.mac(), 100),
        (HOSTNAME_LABEL, identity.hostname(), 180),
    ];
    for (name, text, y) in fields {
        draw(
            Text::with_baseline(name, Point::new(LEFT_MARGIN, y), label, Baseline::Top),
            &mut image,
        );
        draw(
            Text::with_baseline(text, Point::new(LEFT_MARGIN, y + 30), value, Baseline::Top),
            &mut image,
        );
    }

    let body = MonoTextStyle::new(&FONT_8X13, BinaryColor::On);
    for (i, line) in INSTRUCTIONS.iter().enumerate() {
        let y = 270 + 25 * i as i32;
        draw(
            Text::with_baseline(line, Point::new(LEFT_MARGIN, y), body, Baseline::Top),
            &mut image,
        );
    }

    // Footer bar
    let footer_top = height.saturating_sub(FOOTER_HEIGHT);
    draw(
        Rectangle::new(Point::new(0, footer_top as i32), Size::new(width, FOOTER_HEIGHT))
            .into_styled(black_style),
        &mut image,
    );
    let footer = format!("Documentation: {URL_WIKI}");
    draw(
        Text::with_text_style(
            &footer,
            Point::new(center_x, footer_top as i32 + 13),
            MonoTextStyle::new(&FONT_8X13, BinaryColor::Off),
            centered,
        ),
        &mut image,
    );

    image
}
