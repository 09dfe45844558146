//! Interactive menu: converter screen, mini-shop and validated prompts.

use rust_decimal::{Decimal, RoundingStrategy};
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::models::{Conversion, ConversionOutcome, Product};
use crate::service::{is_currency_code, ConversionService};

pub fn catalog() -> Vec<Product> {
    vec![
        Product::new("USB-C Cable", Decimal::new(499, 2), "USD"),
        Product::new("Wireless Mouse", Decimal::new(1250, 2), "USD"),
        Product::new("Mechanical Keyboard", Decimal::new(3900, 2), "EUR"),
        Product::new("Headphones", Decimal::new(3500, 0), "RUB"),
        Product::new("Monitor 24\"", Decimal::new(120, 0), "USD"),
    ]
}

/// Accepts `19.99` or `19,99`; only strictly positive values.
pub fn parse_amount(input: &str) -> Option<Decimal> {
    let normalized = input.trim().replace(',', ".");
    Decimal::from_str(&normalized)
        .ok()
        .filter(|amount| *amount > Decimal::ZERO)
}

pub fn parse_currency_code(input: &str) -> Option<String> {
    let code = input.trim().to_uppercase();
    is_currency_code(&code).then_some(code)
}

pub fn parse_quantity(input: &str, min: u32) -> Option<u32> {
    input.trim().parse::<u32>().ok().filter(|qty| *qty >= min)
}

/// Rounds half away from zero for display, the way receipts show money.
fn shown(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_rate_lines(currency: &str, conversion: &Conversion) -> String {
    format!(
        "Rate: 1 {} = {:.4} KZT\nUpdated: {}",
        currency,
        shown(conversion.rate_used, 4),
        conversion.last_update_label
    )
}

pub fn format_total(amount: Decimal, currency: &str, conversion: &Conversion) -> String {
    format!(
        "Total: {:.2} {} = {:.2} KZT",
        shown(amount, 2),
        currency,
        shown(conversion.converted_amount, 2)
    )
}

pub fn format_product_line(number: usize, product: &Product) -> String {
    format!(
        "{}) {} - {:.2} {}",
        number,
        product.name,
        shown(product.unit_price, 2),
        product.currency
    )
}

/// Prompt loop over any line source. `None` from a prompt means input ended.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub async fn run(&mut self, service: &ConversionService) -> io::Result<()> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "=== KZT Price Console ===")?;
            writeln!(self.output, "1) Currency converter -> KZT (live rate)")?;
            writeln!(self.output, "2) Mini-shop (prices in USD/EUR/RUB -> KZT)")?;
            writeln!(self.output, "0) Exit")?;

            let Some(choice) = self.prompt("Choice: ")? else {
                return Ok(());
            };

            let keep_going = match choice.as_str() {
                "0" => return Ok(()),
                "1" => self.run_converter(service).await?,
                "2" => self.run_shop(service).await?,
                _ => {
                    writeln!(self.output, "Error: unknown menu option.")?;
                    true
                }
            };

            if !keep_going {
                return Ok(());
            }
        }
    }

    /// Returns `false` when input ended mid-screen.
    pub async fn run_converter(&mut self, service: &ConversionService) -> io::Result<bool> {
        writeln!(self.output)?;
        writeln!(self.output, "--- Converter -> KZT ---")?;

        let Some(amount) = self.read_amount("Enter amount (e.g. 19.99): ")? else {
            return Ok(false);
        };
        let Some(from) = self.read_currency_code("Enter currency (USD/EUR/RUB/KZT ...): ")? else {
            return Ok(false);
        };

        match service.convert_to_kzt(amount, &from).await {
            ConversionOutcome::Success(conversion) => {
                writeln!(self.output)?;
                writeln!(self.output, "{}", format_rate_lines(&from, &conversion))?;
                writeln!(self.output, "{}", format_total(amount, &from, &conversion))?;
            }
            ConversionOutcome::Failure { message } => {
                writeln!(self.output, "Error: {}", message)?;
            }
        }

        Ok(true)
    }

    pub async fn run_shop(&mut self, service: &ConversionService) -> io::Result<bool> {
        writeln!(self.output)?;
        writeln!(self.output, "--- Mini-shop ---")?;

        let products = catalog();

        loop {
            writeln!(self.output)?;
            writeln!(self.output, "Products:")?;
            for (i, product) in products.iter().enumerate() {
                writeln!(self.output, "{}", format_product_line(i + 1, product))?;
            }
            writeln!(self.output, "0) Back")?;

            let Some(choice) = self.prompt("Product: ")? else {
                return Ok(false);
            };
            if choice == "0" {
                return Ok(true);
            }

            let product = match choice.parse::<usize>() {
                Ok(n) if (1..=products.len()).contains(&n) => &products[n - 1],
                _ => {
                    writeln!(self.output, "Error: no such product.")?;
                    continue;
                }
            };

            let Some(qty) = self.read_quantity("Quantity: ", 1)? else {
                return Ok(false);
            };
            let total = product.total(qty);

            match service.convert_to_kzt(total, &product.currency).await {
                ConversionOutcome::Success(conversion) => {
                    writeln!(self.output)?;
                    writeln!(self.output, "Product: {}", product.name)?;
                    writeln!(self.output, "Sum: {:.2} {} (x{})", shown(total, 2), product.currency, qty)?;
                    writeln!(self.output, "{}", format_rate_lines(&product.currency, &conversion))?;
                    writeln!(self.output, "Due: {:.2} KZT", shown(conversion.converted_amount, 2))?;
                }
                ConversionOutcome::Failure { message } => {
                    writeln!(self.output, "Error: {}", message)?;
                }
            }
        }
    }

    pub fn read_amount(&mut self, prompt: &str) -> io::Result<Option<Decimal>> {
        self.read_until(prompt, parse_amount, "Error: enter a number > 0 (e.g. 19.99).")
    }

    pub fn read_currency_code(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.read_until(
            prompt,
            parse_currency_code,
            "Error: currency must be 3 letters (USD/EUR/RUB/KZT...).",
        )
    }

    pub fn read_quantity(&mut self, prompt: &str, min: u32) -> io::Result<Option<u32>> {
        let hint = format!("Error: enter a whole number >= {}.", min);
        self.read_until(prompt, |line| parse_quantity(line, min), &hint)
    }

    fn read_until<T>(
        &mut self,
        prompt: &str,
        parse: impl Fn(&str) -> Option<T>,
        hint: &str,
    ) -> io::Result<Option<T>> {
        loop {
            let Some(line) = self.prompt(prompt)? else {
                return Ok(None);
            };
            if let Some(value) = parse(&line) {
                return Ok(Some(value));
            }
            writeln!(self.output, "{}", hint)?;
        }
    }

    fn prompt(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
